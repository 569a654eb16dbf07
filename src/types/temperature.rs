// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-point temperature type and named setpoint presets.
//!
//! The appliance transmits temperatures as unsigned little-endian integers in
//! tenths of a degree Celsius. [`Temperature`] stores that wire value
//! unchanged, so every comparison in the session state machine and the polling
//! policy works on exact integers; conversion to degrees happens once, at
//! construction or display.

use std::fmt;

use crate::error::ValueError;

/// A temperature in tenths of a degree Celsius.
///
/// Any reading the appliance can report is representable (0.0 °C to
/// 6553.5 °C). The heater setpoint envelope is narrower; use
/// [`Temperature::setpoint`] to construct a validated target value.
///
/// Serialized as the raw deci-degree integer.
///
/// # Examples
///
/// ```
/// use volcano_ble::Temperature;
///
/// let target = Temperature::setpoint(185)?;
/// assert_eq!(target.deci(), 1850);
/// assert_eq!(target.to_string(), "185.0°C");
///
/// // Readings outside the setpoint envelope are still representable
/// let ambient = Temperature::from_deci(236);
/// assert_eq!(ambient.to_string(), "23.6°C");
/// # Ok::<(), volcano_ble::ValueError>(())
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Temperature(u16);

impl Temperature {
    /// 0.0 °C.
    pub const ZERO: Self = Self(0);

    /// Lowest accepted heater setpoint (40 °C).
    pub const SETPOINT_MIN: Self = Self(400);

    /// Highest accepted heater setpoint (230 °C).
    pub const SETPOINT_MAX: Self = Self(2300);

    /// Creates a temperature from a raw deci-degree wire value.
    #[must_use]
    pub const fn from_deci(deci: u16) -> Self {
        Self(deci)
    }

    /// Creates a temperature from whole degrees Celsius.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value does not fit the
    /// deci-degree wire representation (above 6553 °C).
    pub fn from_celsius(celsius: u16) -> Result<Self, ValueError> {
        const MAX_CELSIUS: u16 = u16::MAX / 10;
        if celsius > MAX_CELSIUS {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: MAX_CELSIUS,
                actual: celsius,
            });
        }
        Ok(Self(celsius * 10))
    }

    /// Creates a validated heater setpoint.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value is outside the
    /// supported envelope [40, 230] °C.
    pub fn setpoint(celsius: u16) -> Result<Self, ValueError> {
        let min = Self::SETPOINT_MIN.whole_celsius();
        let max = Self::SETPOINT_MAX.whole_celsius();
        if !(min..=max).contains(&celsius) {
            return Err(ValueError::OutOfRange {
                min,
                max,
                actual: celsius,
            });
        }
        Ok(Self(celsius * 10))
    }

    /// Returns the raw deci-degree value.
    #[must_use]
    pub const fn deci(self) -> u16 {
        self.0
    }

    /// Returns whole degrees Celsius (truncated).
    #[must_use]
    pub const fn whole_celsius(self) -> u16 {
        self.0 / 10
    }

    /// Returns degrees Celsius as a float, for display purposes only.
    ///
    /// All threshold comparisons in this crate use the integer
    /// [`deci`](Self::deci) value.
    #[must_use]
    pub fn celsius(self) -> f32 {
        f32::from(self.0) / 10.0
    }

    /// Returns the absolute difference to `other` in deci-degrees.
    #[must_use]
    pub const fn distance_to(self, other: Self) -> u16 {
        self.0.abs_diff(other.0)
    }

    /// Returns `true` for the all-zero reading the appliance reports when no
    /// target is programmed.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Default for Temperature {
    /// The appliance's factory default target (180 °C).
    fn default() -> Self {
        Self(1800)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}°C", self.0 / 10, self.0 % 10)
    }
}

/// Named heater setpoints offered by the appliance's companion controls.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// 185 °C — emphasizes taste.
    Flavor,
    /// 190 °C — the middle ground.
    Balanced,
    /// 195 °C — stronger extraction.
    Potent,
    /// 200 °C — maximum extraction.
    Maximum,
}

impl Preset {
    /// All presets, mildest first.
    pub const ALL: [Self; 4] = [Self::Flavor, Self::Balanced, Self::Potent, Self::Maximum];

    /// Returns the setpoint this preset stands for.
    #[must_use]
    pub const fn temperature(self) -> Temperature {
        match self {
            Self::Flavor => Temperature(1850),
            Self::Balanced => Temperature(1900),
            Self::Potent => Temperature(1950),
            Self::Maximum => Temperature(2000),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flavor => "flavor",
            Self::Balanced => "balanced",
            Self::Potent => "potent",
            Self::Maximum => "maximum",
        };
        write!(f, "{name}")
    }
}

impl From<Preset> for Temperature {
    fn from(preset: Preset) -> Self {
        preset.temperature()
    }
}
