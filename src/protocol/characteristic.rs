// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GATT characteristic table for the appliance.
//!
//! All characteristics live under one primary service ([`SERVICE_UUID`]).
//! Byte layouts are fixed per characteristic:
//!
//! | Characteristic       | Layout                    |
//! |----------------------|---------------------------|
//! | `CurrentTemperature` | u16 LE, tenths of °C      |
//! | `TargetTemperature`  | u16 LE, tenths of °C      |
//! | `HeaterFlag`         | 1 byte, zero/non-zero     |
//! | `FanFlag`            | 1 byte, zero/non-zero     |
//! | `Brightness`         | 1 byte, 0..=100           |
//! | `FanTimer`           | u16 LE, seconds           |
//! | `Firmware`           | UTF-8, NUL padded         |
//! | `BleFirmware`        | UTF-8, NUL padded         |
//! | `SerialNumber`       | UTF-8, NUL padded         |
//! | `OperationTime`      | u32 LE, minutes           |
//!
//! Writable characteristics use the same layout in both directions.

use std::fmt;

use uuid::Uuid;

/// UUID of the primary service exposing every characteristic below.
///
/// Useful for discovery filters in host transport implementations.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x1010_0000_5354_4f52_5a26_4249_434b_454c);

/// A named GATT characteristic of the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Chamber temperature as currently measured.
    CurrentTemperature,
    /// Programmed heater setpoint.
    TargetTemperature,
    /// Heater on/off state.
    HeaterFlag,
    /// Airflow fan on/off state.
    FanFlag,
    /// LED panel brightness.
    Brightness,
    /// Fan auto-off timer.
    FanTimer,
    /// Appliance firmware version string.
    Firmware,
    /// Bluetooth module firmware version string.
    BleFirmware,
    /// Factory serial number string.
    SerialNumber,
    /// Lifetime heater operation counter.
    OperationTime,
}

impl Characteristic {
    /// Every characteristic the appliance exposes.
    pub const ALL: [Self; 10] = [
        Self::CurrentTemperature,
        Self::TargetTemperature,
        Self::HeaterFlag,
        Self::FanFlag,
        Self::Brightness,
        Self::FanTimer,
        Self::Firmware,
        Self::BleFirmware,
        Self::SerialNumber,
        Self::OperationTime,
    ];

    /// The fast-changing characteristics read on every poll cycle.
    pub const TELEMETRY: [Self; 4] = [
        Self::CurrentTemperature,
        Self::TargetTemperature,
        Self::HeaterFlag,
        Self::FanFlag,
    ];

    /// The near-constant characteristics fetched on the slow metadata cadence.
    pub const METADATA: [Self; 4] = [
        Self::Firmware,
        Self::BleFirmware,
        Self::SerialNumber,
        Self::OperationTime,
    ];

    /// Returns the GATT UUID of this characteristic.
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        match self {
            Self::CurrentTemperature => Uuid::from_u128(0x1011_0001_5354_4f52_5a26_4249_434b_454c),
            Self::TargetTemperature => Uuid::from_u128(0x1011_0003_5354_4f52_5a26_4249_434b_454c),
            Self::Brightness => Uuid::from_u128(0x1011_0005_5354_4f52_5a26_4249_434b_454c),
            Self::HeaterFlag => Uuid::from_u128(0x1011_000f_5354_4f52_5a26_4249_434b_454c),
            Self::FanFlag => Uuid::from_u128(0x1011_0013_5354_4f52_5a26_4249_434b_454c),
            Self::OperationTime => Uuid::from_u128(0x1011_0015_5354_4f52_5a26_4249_434b_454c),
            Self::FanTimer => Uuid::from_u128(0x1011_0017_5354_4f52_5a26_4249_434b_454c),
            Self::Firmware => Uuid::from_u128(0x1010_0003_5354_4f52_5a26_4249_434b_454c),
            Self::BleFirmware => Uuid::from_u128(0x1010_0004_5354_4f52_5a26_4249_434b_454c),
            Self::SerialNumber => Uuid::from_u128(0x1010_0008_5354_4f52_5a26_4249_434b_454c),
        }
    }

    /// Resolves a GATT UUID back to its characteristic.
    ///
    /// Intended for host transports routing incoming notifications.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    /// Human-readable name, used in log and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CurrentTemperature => "current temperature",
            Self::TargetTemperature => "target temperature",
            Self::HeaterFlag => "heater flag",
            Self::FanFlag => "fan flag",
            Self::Brightness => "brightness",
            Self::FanTimer => "fan timer",
            Self::Firmware => "firmware version",
            Self::BleFirmware => "BLE firmware version",
            Self::SerialNumber => "serial number",
            Self::OperationTime => "operation time",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
