// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adaptive polling cadence.
//!
//! BLE reads cost airtime and battery on both ends, so the monitor does not
//! poll at a fixed rate. [`PollPolicy`] maps the latest snapshot to how soon
//! the next poll should happen: tight while something is moving (fan running,
//! heater closing in on the target), relaxed while the appliance sits cold.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::DeviceSnapshot;
use crate::types::Temperature;

/// What the next poll cycle should do and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPlan {
    /// Delay before the next telemetry poll.
    pub interval: Duration,
    /// Whether the slow-moving metadata characteristics are due as well.
    pub fetch_metadata: bool,
}

/// Cadence rules, evaluated top to bottom; the first matching rule wins.
///
/// 1. Fan running: [`fan_interval`](Self::fan_interval).
/// 2. Chamber within [`approach_window`](Self::approach_window) of a set
///    target: [`approach_interval`](Self::approach_interval).
/// 3. Heater on: [`heating_interval`](Self::heating_interval).
/// 4. Chamber still above [`warm_threshold`](Self::warm_threshold):
///    [`cooling_interval`](Self::cooling_interval).
/// 5. Otherwise: [`idle_interval`](Self::idle_interval).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Cadence while the fan runs; inhalation-relevant, so the fastest.
    pub fan_interval: Duration,
    /// Cadence while the heater closes in on the target.
    pub approach_interval: Duration,
    /// Cadence while the heater is on but still far from the target.
    pub heating_interval: Duration,
    /// Cadence while a hot chamber cools with everything switched off.
    pub cooling_interval: Duration,
    /// Cadence while the appliance sits cold and idle.
    pub idle_interval: Duration,
    /// Half-width of the approach band around the target, in tenths of a
    /// degree Celsius.
    pub approach_window: u16,
    /// Chamber temperatures above this count as still cooling down.
    pub warm_threshold: Temperature,
    /// How stale cached metadata may get before a poll refreshes it.
    pub metadata_refresh: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            fan_interval: Duration::from_secs(1),
            approach_interval: Duration::from_secs(1),
            heating_interval: Duration::from_secs(2),
            cooling_interval: Duration::from_secs(3),
            idle_interval: Duration::from_secs(5),
            approach_window: 100,
            warm_threshold: Temperature::from_deci(500),
            metadata_refresh: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    /// Plans the next poll from the latest snapshot and the age of the
    /// cached metadata. `None` means metadata has never been fetched.
    #[must_use]
    pub fn plan(&self, snapshot: &DeviceSnapshot, metadata_age: Option<Duration>) -> PollPlan {
        let fetch_metadata = metadata_age.is_none_or(|age| age >= self.metadata_refresh);
        let near_target = snapshot.has_target()
            && snapshot
                .current_temperature
                .distance_to(snapshot.target_temperature)
                <= self.approach_window;
        let interval = if snapshot.fan_on {
            self.fan_interval
        } else if near_target {
            self.approach_interval
        } else if snapshot.heater_on {
            self.heating_interval
        } else if snapshot.current_temperature > self.warm_threshold {
            self.cooling_interval
        } else {
            self.idle_interval
        };
        PollPlan {
            interval,
            fetch_metadata,
        }
    }
}
