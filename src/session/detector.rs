// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session boundary detection over the decoded telemetry stream.
//!
//! The appliance has no notion of a "session"; it only reports temperatures
//! and switch flags. [`SessionDetector`] reconstructs sessions from that
//! stream with a small state machine. It is purely reactive: time only
//! enters through snapshot timestamps, never through the system clock, so
//! replaying a recorded snapshot log always reproduces the same events.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::DeviceEvent;
use crate::state::DeviceSnapshot;
use crate::types::Temperature;

use super::record::Session;

/// Where the detector currently is in the session lifecycle.
///
/// `Ended` is visible for exactly one observation after a session closes,
/// then collapses back to `Idle` on the next snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session; the appliance is cold or merely coasting.
    Idle,
    /// A session is open and the chamber is still climbing to the target.
    Heating,
    /// The chamber has reached the target band.
    Ready,
    /// The fan has run at least once during this session.
    Active,
    /// The session just closed.
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Heating => "heating",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

/// Thresholds for the session state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// A session can only start while the chamber is below this.
    pub cold_threshold: Temperature,
    /// Tolerance around the target that counts as "reached", in tenths of a
    /// degree Celsius.
    pub ready_band: u16,
    /// Falling through this while a session is open ends it.
    pub end_threshold: Temperature,
    /// Sessions shorter than this that never reached the target band are
    /// discarded as false starts.
    pub min_duration: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cold_threshold: Temperature::from_deci(500),
            ready_band: 30,
            end_threshold: Temperature::from_deci(600),
            min_duration: Duration::from_secs(60),
        }
    }
}

/// Everything one observation produced: events to publish, in order, and
/// the finalized session when one closed (already absent for discarded
/// false starts).
#[derive(Debug, Default)]
pub struct Detection {
    pub events: Vec<DeviceEvent>,
    pub completed: Option<Session>,
}

/// The session state machine. Feed it every decoded snapshot in order.
#[derive(Debug)]
pub struct SessionDetector {
    config: DetectorConfig,
    phase: SessionPhase,
    session: Option<Session>,
    previous: Option<DeviceSnapshot>,
}

impl SessionDetector {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            phase: SessionPhase::Idle,
            session: None,
            previous: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The open session record, if a session is in progress.
    #[must_use]
    pub fn active_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Advances the state machine by one snapshot.
    ///
    /// Events come back in transition order within the observation: a
    /// session start precedes a fan edge seen in the same snapshot, and a
    /// fan edge precedes the session end.
    pub fn observe(&mut self, snapshot: &DeviceSnapshot) -> Detection {
        let mut detection = Detection::default();
        if self.phase == SessionPhase::Ended {
            self.phase = SessionPhase::Idle;
        }

        let fan_edge = self.fan_edge(snapshot);
        let cooled_off = self.fell_through_end_threshold(snapshot);

        if self.phase == SessionPhase::Idle && self.should_start(snapshot) {
            let session = Session::begin(snapshot.taken_at, snapshot.current_temperature);
            tracing::debug!(session_id = %session.id, "session started");
            detection.events.push(DeviceEvent::SessionStarted {
                timestamp: snapshot.taken_at,
                session_id: session.id,
                target_temperature: snapshot.target_temperature,
                current_temperature: snapshot.current_temperature,
            });
            self.session = Some(session);
            self.phase = SessionPhase::Heating;
        }

        if self.phase == SessionPhase::Idle {
            // Fan used without a session, e.g. to cool the chamber.
            match fan_edge {
                Some(true) => detection.events.push(DeviceEvent::FanStarted {
                    timestamp: snapshot.taken_at,
                    session_active: false,
                }),
                Some(false) => detection.events.push(DeviceEvent::FanStopped {
                    timestamp: snapshot.taken_at,
                    session_active: false,
                }),
                None => {}
            }
        } else {
            let within_band = snapshot.has_target()
                && snapshot
                    .current_temperature
                    .distance_to(snapshot.target_temperature)
                    <= self.config.ready_band;
            if let Some(session) = self.session.as_mut() {
                session.note_temperature(snapshot.current_temperature);
                if self.phase == SessionPhase::Heating && within_band {
                    self.phase = SessionPhase::Ready;
                    detection.events.push(DeviceEvent::TemperatureReached {
                        timestamp: snapshot.taken_at,
                        session_id: session.id,
                        target_temperature: snapshot.target_temperature,
                        current_temperature: snapshot.current_temperature,
                    });
                }
                match fan_edge {
                    Some(true) => {
                        session.record_fan_cycle();
                        self.phase = SessionPhase::Active;
                        detection.events.push(DeviceEvent::FanStarted {
                            timestamp: snapshot.taken_at,
                            session_active: true,
                        });
                    }
                    Some(false) => detection.events.push(DeviceEvent::FanStopped {
                        timestamp: snapshot.taken_at,
                        session_active: true,
                    }),
                    None => {}
                }
            }
            if !snapshot.heater_on || cooled_off {
                self.end_session(snapshot, &mut detection);
            }
        }

        self.previous = Some(snapshot.clone());
        detection
    }

    /// A session starts when the chamber rises from below the cold baseline
    /// while the heater is on and a target is set.
    fn should_start(&self, snapshot: &DeviceSnapshot) -> bool {
        let Some(previous) = &self.previous else {
            return false;
        };
        snapshot.heater_on
            && snapshot.has_target()
            && previous.current_temperature < self.config.cold_threshold
            && snapshot.current_temperature > previous.current_temperature
    }

    /// The cool-down check is a falling edge through the end threshold, not
    /// a level check: during warm-up the chamber is legitimately below it.
    fn fell_through_end_threshold(&self, snapshot: &DeviceSnapshot) -> bool {
        let Some(previous) = &self.previous else {
            return false;
        };
        previous.current_temperature >= self.config.end_threshold
            && snapshot.current_temperature < self.config.end_threshold
    }

    fn fan_edge(&self, snapshot: &DeviceSnapshot) -> Option<bool> {
        let previously_on = self.previous.as_ref().is_some_and(|p| p.fan_on);
        if snapshot.fan_on == previously_on {
            None
        } else {
            Some(snapshot.fan_on)
        }
    }

    fn end_session(&mut self, snapshot: &DeviceSnapshot, detection: &mut Detection) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.finish(snapshot.taken_at);
        let heating_only = self.phase == SessionPhase::Heating;
        self.phase = SessionPhase::Ended;

        let min_millis = i64::try_from(self.config.min_duration.as_millis()).unwrap_or(i64::MAX);
        let lived_millis = session
            .duration()
            .map_or(0, |duration| duration.num_milliseconds());
        if heating_only && lived_millis < min_millis {
            tracing::debug!(session_id = %session.id, lived_millis, "discarding false start");
            return;
        }

        tracing::debug!(
            session_id = %session.id,
            fan_cycles = session.fan_cycles,
            "session ended"
        );
        detection.events.push(DeviceEvent::SessionEnded {
            timestamp: snapshot.taken_at,
            session_id: session.id,
            started_at: session.started_at,
            ended_at: snapshot.taken_at,
            duration_minutes: session.duration_minutes().unwrap_or(0.0),
            peak_temperature: session.peak_temperature,
            fan_cycles: session.fan_cycles,
        });
        detection.completed = Some(session);
    }
}

impl Default for SessionDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn snap(at_secs: i64, current: u16, target: u16, heater: bool, fan: bool) -> DeviceSnapshot {
        DeviceSnapshot {
            current_temperature: Temperature::from_deci(current),
            target_temperature: Temperature::from_deci(target),
            heater_on: heater,
            fan_on: fan,
            firmware_version: None,
            ble_firmware_version: None,
            serial_number: None,
            operation_minutes: None,
            taken_at: base() + chrono::Duration::seconds(at_secs),
        }
    }

    fn run(detector: &mut SessionDetector, snapshots: &[DeviceSnapshot]) -> Vec<DeviceEvent> {
        snapshots
            .iter()
            .flat_map(|snapshot| detector.observe(snapshot).events)
            .collect()
    }

    fn kinds(events: &[DeviceEvent]) -> Vec<&'static str> {
        events.iter().map(DeviceEvent::kind).collect()
    }

    #[test]
    fn cold_rise_with_heater_and_target_starts_a_session() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
            ],
        );
        assert_eq!(kinds(&events), ["session_started"]);
        assert_eq!(detector.phase(), SessionPhase::Heating);
        assert!(detector.active_session().is_some());
    }

    #[test]
    fn no_start_without_a_rise() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 400, 1950, true, false),
            ],
        );
        assert!(events.is_empty());
        assert_eq!(detector.phase(), SessionPhase::Idle);
    }

    #[test]
    fn no_start_without_a_target() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[snap(0, 400, 0, false, false), snap(2, 420, 0, true, false)],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn no_start_while_heater_is_off() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, false, false),
            ],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn no_start_from_a_warm_chamber() {
        // Rising from 80°C means we attached mid-cooldown, not that a
        // session began.
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 800, 1950, false, false),
                snap(2, 820, 1950, true, false),
            ],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn first_snapshot_alone_never_starts_a_session() {
        let mut detector = SessionDetector::default();
        let detection = detector.observe(&snap(0, 420, 1950, true, false));
        assert!(detection.events.is_empty());
    }

    #[test]
    fn reaching_the_target_band_emits_once() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
                snap(30, 1500, 1950, true, false),
                snap(60, 1930, 1950, true, false),
                snap(62, 1945, 1950, true, false),
                snap(64, 1925, 1950, true, false),
            ],
        );
        assert_eq!(kinds(&events), ["session_started", "temperature_reached"]);
        assert_eq!(detector.phase(), SessionPhase::Ready);
    }

    #[test]
    fn warming_up_below_the_end_threshold_does_not_end() {
        // 42°C -> 45°C -> 55°C are all below 60°C, but the session has
        // never been above it, so nothing falls through the threshold.
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
                snap(4, 450, 1950, true, false),
                snap(6, 550, 1950, true, false),
            ],
        );
        assert_eq!(kinds(&events), ["session_started"]);
        assert_eq!(detector.phase(), SessionPhase::Heating);
    }

    #[test]
    fn fan_cycles_are_counted_per_start() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
                snap(60, 1930, 1950, true, false),
                snap(70, 1940, 1950, true, true),
                snap(80, 1938, 1950, true, false),
                snap(90, 1941, 1950, true, true),
            ],
        );
        assert_eq!(
            kinds(&events),
            [
                "session_started",
                "temperature_reached",
                "fan_started",
                "fan_stopped",
                "fan_started",
            ]
        );
        assert_eq!(detector.phase(), SessionPhase::Active);
        assert_eq!(detector.active_session().unwrap().fan_cycles, 2);
    }

    #[test]
    fn fan_stopping_does_not_end_the_session() {
        let mut detector = SessionDetector::default();
        run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
                snap(60, 1930, 1950, true, false),
                snap(70, 1940, 1950, true, true),
                snap(80, 1938, 1950, true, false),
            ],
        );
        assert_eq!(detector.phase(), SessionPhase::Active);
        assert!(detector.active_session().is_some());
    }

    #[test]
    fn heater_off_ends_with_a_full_summary() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
                snap(60, 1930, 1950, true, false),
                snap(70, 1945, 1950, true, true),
                snap(80, 1941, 1950, true, false),
                snap(90, 1900, 1950, false, false),
            ],
        );
        let Some(DeviceEvent::SessionEnded {
            started_at,
            ended_at,
            duration_minutes,
            peak_temperature,
            fan_cycles,
            ..
        }) = events.last()
        else {
            panic!("expected a session_ended event, got {events:?}");
        };
        assert_eq!(*started_at, base() + chrono::Duration::seconds(2));
        assert_eq!(*ended_at, base() + chrono::Duration::seconds(90));
        assert!((duration_minutes - 88.0 / 60.0).abs() < 1e-9);
        assert_eq!(*peak_temperature, Temperature::from_deci(1945));
        assert_eq!(*fan_cycles, 1);
        assert_eq!(detector.phase(), SessionPhase::Ended);
        assert!(detector.active_session().is_none());
    }

    #[test]
    fn falling_through_the_end_threshold_ends_the_session() {
        // Heater flag still reads on; the chamber cooling through 60°C is
        // what closes the session.
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(2, 420, 1950, true, false),
                snap(60, 1930, 1950, true, false),
                snap(600, 700, 1950, true, false),
                snap(610, 550, 1950, true, false),
            ],
        );
        assert_eq!(
            kinds(&events),
            ["session_started", "temperature_reached", "session_ended"]
        );
    }

    #[test]
    fn short_false_start_is_discarded_silently() {
        let mut detector = SessionDetector::default();
        let mut completed = Vec::new();
        let mut events = Vec::new();
        for snapshot in [
            snap(0, 400, 1950, false, false),
            snap(5, 450, 1950, true, false),
            snap(15, 700, 1950, true, false),
            snap(25, 550, 1950, true, false),
        ] {
            let detection = detector.observe(&snapshot);
            events.extend(detection.events);
            completed.extend(detection.completed);
        }
        // The start was announced in real time, but the session record and
        // its summary never materialize.
        assert_eq!(kinds(&events), ["session_started"]);
        assert!(completed.is_empty());
        assert_eq!(detector.phase(), SessionPhase::Ended);
    }

    #[test]
    fn long_heating_only_session_is_kept() {
        let mut detector = SessionDetector::default();
        let mut completed = Vec::new();
        for snapshot in [
            snap(0, 400, 1950, false, false),
            snap(5, 450, 1950, true, false),
            snap(100, 1500, 1950, true, false),
            snap(110, 1490, 1950, false, false),
        ] {
            completed.extend(detector.observe(&snapshot).completed);
        }
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].fan_cycles, 0);
    }

    #[test]
    fn fan_run_rescues_a_short_session_from_the_debounce() {
        // Ending from Active is never a false start, however short.
        let mut detector = SessionDetector::default();
        let mut completed = Vec::new();
        for snapshot in [
            snap(0, 400, 1950, false, false),
            snap(5, 450, 1950, true, false),
            snap(10, 600, 1950, true, true),
            snap(20, 650, 1950, false, true),
        ] {
            completed.extend(detector.observe(&snapshot).completed);
        }
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].fan_cycles, 1);
    }

    #[test]
    fn idle_fan_use_reports_inactive_edges() {
        let mut detector = SessionDetector::default();
        let events = run(
            &mut detector,
            &[
                snap(0, 300, 0, false, false),
                snap(5, 300, 0, false, true),
                snap(10, 295, 0, false, false),
            ],
        );
        assert_eq!(kinds(&events), ["fan_started", "fan_stopped"]);
        let all_inactive = events.iter().all(|event| {
            matches!(
                event,
                DeviceEvent::FanStarted {
                    session_active: false,
                    ..
                } | DeviceEvent::FanStopped {
                    session_active: false,
                    ..
                }
            )
        });
        assert!(all_inactive);
        assert_eq!(detector.phase(), SessionPhase::Idle);
    }

    #[test]
    fn ended_collapses_to_idle_and_allows_a_restart() {
        let mut detector = SessionDetector::default();
        run(
            &mut detector,
            &[
                snap(0, 400, 1950, false, false),
                snap(5, 450, 1950, true, false),
                snap(100, 1500, 1950, true, false),
                snap(110, 1490, 1950, false, false),
            ],
        );
        assert_eq!(detector.phase(), SessionPhase::Ended);

        // Cool back down, then heat again: a second session opens.
        let events = run(
            &mut detector,
            &[
                snap(700, 420, 1950, false, false),
                snap(705, 460, 1950, true, false),
            ],
        );
        assert_eq!(kinds(&events), ["session_started"]);
        assert_eq!(detector.phase(), SessionPhase::Heating);
    }

    #[test]
    fn replaying_the_same_log_reproduces_identical_events() {
        let log = [
            snap(0, 400, 1950, false, false),
            snap(2, 420, 1950, true, false),
            snap(60, 1930, 1950, true, false),
            snap(70, 1945, 1950, true, true),
            snap(80, 1941, 1950, true, false),
            snap(90, 1900, 1950, false, false),
        ];
        let first = run(&mut SessionDetector::default(), &log);
        let second = run(&mut SessionDetector::default(), &log);
        assert_eq!(first, second);
    }
}
