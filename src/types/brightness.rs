// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display-brightness type for the appliance's LED panel.

use std::fmt;

use crate::error::ValueError;

/// LED panel brightness as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use volcano_ble::Brightness;
///
/// let brightness = Brightness::new(70).unwrap();
/// assert_eq!(brightness.percent(), 70);
///
/// // Invalid values return error
/// assert!(Brightness::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Brightness(u8);

impl Brightness {
    /// Minimum brightness (panel off).
    pub const MIN: u8 = 0;

    /// Maximum brightness.
    pub const MAX: u8 = 100;

    /// Creates a new brightness value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidBrightness` if value exceeds 100.
    pub fn new(percent: u8) -> Result<Self, ValueError> {
        if percent > Self::MAX {
            return Err(ValueError::InvalidBrightness(percent));
        }
        Ok(Self(percent))
    }

    /// Creates a brightness value, clamping to the valid range.
    #[must_use]
    pub const fn clamped(percent: u8) -> Self {
        if percent > Self::MAX {
            Self(Self::MAX)
        } else {
            Self(percent)
        }
    }

    /// Returns the brightness percentage.
    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.0
    }
}

impl Default for Brightness {
    /// The appliance's factory default panel brightness (70%).
    fn default() -> Self {
        Self(70)
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Brightness {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
