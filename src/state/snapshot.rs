// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The decoded result of one poll cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Temperature;

/// One decoded sample of appliance telemetry.
///
/// A snapshot is an immutable record: each successful poll produces a fresh
/// one that replaces the previous, and no history is kept at this layer. The
/// metadata fields change on a much slower cadence than the telemetry fields
/// and are `None` only until the first metadata fetch has succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Chamber temperature as currently measured.
    pub current_temperature: Temperature,
    /// Programmed heater setpoint; all-zero when no target is set.
    pub target_temperature: Temperature,
    /// Whether the heater is running.
    pub heater_on: bool,
    /// Whether the airflow fan is running.
    pub fan_on: bool,
    /// Appliance firmware version, if fetched.
    pub firmware_version: Option<String>,
    /// Bluetooth module firmware version, if fetched.
    pub ble_firmware_version: Option<String>,
    /// Factory serial number, if fetched.
    pub serial_number: Option<String>,
    /// Lifetime heater operation counter in minutes, if fetched.
    pub operation_minutes: Option<u32>,
    /// When this sample was taken.
    pub taken_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    /// Returns `true` if the appliance reports a programmed heater setpoint.
    #[must_use]
    pub fn has_target(&self) -> bool {
        !self.target_temperature.is_zero()
    }

    /// Carries metadata forward from an older snapshot.
    ///
    /// Poll cycles between slow-cadence metadata fetches read only telemetry;
    /// this keeps the last-known firmware/serial/counter values visible on
    /// every snapshot instead of blanking them between fetches.
    pub fn inherit_metadata(&mut self, previous: &DeviceSnapshot) {
        if self.firmware_version.is_none() {
            self.firmware_version = previous.firmware_version.clone();
        }
        if self.ble_firmware_version.is_none() {
            self.ble_firmware_version = previous.ble_firmware_version.clone();
        }
        if self.serial_number.is_none() {
            self.serial_number = previous.serial_number.clone();
        }
        if self.operation_minutes.is_none() {
            self.operation_minutes = previous.operation_minutes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(target_deci: u16) -> DeviceSnapshot {
        DeviceSnapshot {
            current_temperature: Temperature::from_deci(400),
            target_temperature: Temperature::from_deci(target_deci),
            heater_on: false,
            fan_on: false,
            firmware_version: None,
            ble_firmware_version: None,
            serial_number: None,
            operation_minutes: None,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn has_target_checks_for_zero() {
        assert!(!sample(0).has_target());
        assert!(sample(1850).has_target());
    }

    #[test]
    fn inherit_metadata_fills_only_missing_fields() {
        let mut older = sample(1850);
        older.firmware_version = Some("V01.22".to_string());
        older.serial_number = Some("SN0001234".to_string());
        older.operation_minutes = Some(500);

        let mut newer = sample(1850);
        newer.firmware_version = Some("V01.23".to_string());
        newer.inherit_metadata(&older);

        // Freshly fetched value wins; gaps are filled from the older sample.
        assert_eq!(newer.firmware_version.as_deref(), Some("V01.23"));
        assert_eq!(newer.serial_number.as_deref(), Some("SN0001234"));
        assert_eq!(newer.operation_minutes, Some(500));
        assert_eq!(newer.ble_firmware_version, None);
    }
}
