// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::SERVICE_UUID;
use crate::types::Temperature;

/// One user-initiated heating cycle, from heater activation to cool-down.
///
/// The id is derived from the start timestamp, so replaying the same
/// snapshot log reproduces the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Highest chamber temperature observed so far.
    pub peak_temperature: Temperature,
    /// Number of times the fan was switched on during the session.
    pub fan_cycles: u32,
}

impl Session {
    /// Opens a new session record at the given instant.
    #[must_use]
    pub fn begin(started_at: DateTime<Utc>, current: Temperature) -> Self {
        let id = Uuid::new_v5(&SERVICE_UUID, &started_at.timestamp_millis().to_be_bytes());
        Self {
            id,
            started_at,
            ended_at: None,
            peak_temperature: current,
            fan_cycles: 0,
        }
    }

    /// Folds an observed chamber temperature into the peak.
    pub fn note_temperature(&mut self, temperature: Temperature) {
        if temperature > self.peak_temperature {
            self.peak_temperature = temperature;
        }
    }

    pub fn record_fan_cycle(&mut self) {
        self.fan_cycles += 1;
    }

    /// Closes the record at the given instant.
    pub fn finish(&mut self, ended_at: DateTime<Utc>) {
        self.ended_at = Some(ended_at);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Wall-clock length of the session, `None` while it is still open.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|ended_at| ended_at - self.started_at)
    }

    /// Session length in fractional minutes, `None` while it is still open.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_minutes(&self) -> Option<f64> {
        self.duration()
            .map(|duration| duration.num_milliseconds() as f64 / 60_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn begin_seeds_peak_with_current_temperature() {
        let session = Session::begin(start(), Temperature::from_deci(420));
        assert_eq!(session.peak_temperature, Temperature::from_deci(420));
        assert_eq!(session.fan_cycles, 0);
        assert!(!session.is_finished());
    }

    #[test]
    fn peak_only_moves_upward() {
        let mut session = Session::begin(start(), Temperature::from_deci(420));
        session.note_temperature(Temperature::from_deci(1900));
        session.note_temperature(Temperature::from_deci(1700));
        assert_eq!(session.peak_temperature, Temperature::from_deci(1900));
    }

    #[test]
    fn fan_cycles_accumulate() {
        let mut session = Session::begin(start(), Temperature::from_deci(420));
        session.record_fan_cycle();
        session.record_fan_cycle();
        assert_eq!(session.fan_cycles, 2);
    }

    #[test]
    fn duration_is_fractional_minutes() {
        let mut session = Session::begin(start(), Temperature::from_deci(420));
        session.finish(start() + chrono::Duration::seconds(90));
        assert_eq!(session.duration_minutes(), Some(1.5));
        assert!(session.is_finished());
    }

    #[test]
    fn open_session_has_no_duration() {
        let session = Session::begin(start(), Temperature::from_deci(420));
        assert_eq!(session.duration(), None);
        assert_eq!(session.duration_minutes(), None);
    }

    #[test]
    fn id_is_reproducible_from_the_start_instant() {
        let a = Session::begin(start(), Temperature::from_deci(420));
        let b = Session::begin(start(), Temperature::from_deci(990));
        let c = Session::begin(start() + chrono::Duration::seconds(1), Temperature::from_deci(420));
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }
}
