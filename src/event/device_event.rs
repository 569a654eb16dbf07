// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification records published on the event bus.
//!
//! Every event is a flat, timestamped record. The serialized form is a JSON
//! object with a `kind` discriminator and a `timestamp`, followed by the
//! kind-specific fields, which is exactly what host notification buses
//! forward to their consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ConnectionState;
use crate::types::Temperature;

/// A discrete, timestamped notification.
///
/// Session events are emitted in detector order, strictly ordered relative to
/// the state changes that caused them. Connection events are emitted on every
/// lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// The link lifecycle state changed.
    ConnectionChanged {
        /// When the transition happened.
        timestamp: DateTime<Utc>,
        /// The state entered.
        state: ConnectionState,
    },

    /// A heating session began.
    SessionStarted {
        /// When the session began.
        timestamp: DateTime<Utc>,
        /// Identity of the session being opened.
        session_id: Uuid,
        /// The programmed setpoint at session start.
        target_temperature: Temperature,
        /// The chamber temperature at session start.
        current_temperature: Temperature,
    },

    /// The chamber reached the programmed setpoint.
    TemperatureReached {
        /// When the setpoint was reached.
        timestamp: DateTime<Utc>,
        /// Identity of the open session.
        session_id: Uuid,
        /// The programmed setpoint.
        target_temperature: Temperature,
        /// The measured temperature that satisfied the tolerance.
        current_temperature: Temperature,
    },

    /// The airflow fan switched on.
    FanStarted {
        /// When the fan edge was observed.
        timestamp: DateTime<Utc>,
        /// Whether a session was open when the fan started.
        session_active: bool,
    },

    /// The airflow fan switched off.
    FanStopped {
        /// When the fan edge was observed.
        timestamp: DateTime<Utc>,
        /// Whether a session was open when the fan stopped.
        session_active: bool,
    },

    /// A heating session ended; carries the full session summary.
    SessionEnded {
        /// When the session ended.
        timestamp: DateTime<Utc>,
        /// Identity of the closed session.
        session_id: Uuid,
        /// When the session began.
        started_at: DateTime<Utc>,
        /// When the session ended.
        ended_at: DateTime<Utc>,
        /// Session length in fractional minutes.
        duration_minutes: f64,
        /// Highest chamber temperature observed during the session.
        peak_temperature: Temperature,
        /// Number of fan starts during the session.
        fan_cycles: u32,
    },
}

impl DeviceEvent {
    /// The `kind` discriminator used in the serialized form.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionChanged { .. } => "connection_changed",
            Self::SessionStarted { .. } => "session_started",
            Self::TemperatureReached { .. } => "temperature_reached",
            Self::FanStarted { .. } => "fan_started",
            Self::FanStopped { .. } => "fan_stopped",
            Self::SessionEnded { .. } => "session_ended",
        }
    }

    /// When the event happened.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ConnectionChanged { timestamp, .. }
            | Self::SessionStarted { timestamp, .. }
            | Self::TemperatureReached { timestamp, .. }
            | Self::FanStarted { timestamp, .. }
            | Self::FanStopped { timestamp, .. }
            | Self::SessionEnded { timestamp, .. } => *timestamp,
        }
    }

    /// Returns `true` for events produced by the session detector.
    #[must_use]
    pub fn is_session_event(&self) -> bool {
        !matches!(self, Self::ConnectionChanged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_with_kind_and_timestamp() {
        let event = DeviceEvent::SessionStarted {
            timestamp: Utc::now(),
            session_id: Uuid::nil(),
            target_temperature: Temperature::from_deci(1850),
            current_temperature: Temperature::from_deci(420),
        };

        let value = serde_json::to_value(&event).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["kind"], "session_started");
        assert!(object.contains_key("timestamp"));
        assert_eq!(object["target_temperature"], 1850);
        assert_eq!(object["current_temperature"], 420);
    }

    #[test]
    fn every_kind_serializes_with_discriminator() {
        let now = Utc::now();
        let events = [
            DeviceEvent::ConnectionChanged {
                timestamp: now,
                state: ConnectionState::Connected,
            },
            DeviceEvent::FanStarted {
                timestamp: now,
                session_active: true,
            },
            DeviceEvent::FanStopped {
                timestamp: now,
                session_active: false,
            },
            DeviceEvent::SessionEnded {
                timestamp: now,
                session_id: Uuid::nil(),
                started_at: now,
                ended_at: now,
                duration_minutes: 7.5,
                peak_temperature: Temperature::from_deci(1950),
                fan_cycles: 3,
            },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["kind"], event.kind());
            assert!(value["timestamp"].is_string());
        }
    }

    #[test]
    fn round_trips_through_json() {
        let event = DeviceEvent::SessionEnded {
            timestamp: Utc::now(),
            session_id: Uuid::nil(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            duration_minutes: 12.25,
            peak_temperature: Temperature::from_deci(1940),
            fan_cycles: 2,
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: DeviceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn session_event_classification() {
        let connection = DeviceEvent::ConnectionChanged {
            timestamp: Utc::now(),
            state: ConnectionState::Reconnecting,
        };
        let fan = DeviceEvent::FanStarted {
            timestamp: Utc::now(),
            session_active: false,
        };
        assert!(!connection.is_session_event());
        assert!(fan.is_session_event());
    }
}
