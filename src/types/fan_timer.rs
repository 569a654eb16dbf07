// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan auto-off timer type.
//!
//! The appliance can switch its airflow fan off by itself after a programmed
//! number of seconds. The accepted range is narrow by design: long enough for
//! one balloon fill, never long enough to leave the fan running unattended.

use std::fmt;
use std::time::Duration;

use crate::error::ValueError;

/// Fan auto-off timer in seconds (5-300).
///
/// # Examples
///
/// ```
/// use volcano_ble::FanTimer;
///
/// let timer = FanTimer::new(120).unwrap();  // 2 minutes
/// assert_eq!(timer.seconds(), 120);
///
/// // Invalid values return error
/// assert!(FanTimer::new(4).is_err());
/// assert!(FanTimer::new(301).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FanTimer(u16);

impl FanTimer {
    /// Minimum timer duration (5 seconds).
    pub const MIN: u16 = 5;

    /// Maximum timer duration (300 seconds = 5 minutes).
    pub const MAX: u16 = 300;

    /// Creates a new fan timer.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is outside [5, 300].
    pub fn new(seconds: u16) -> Result<Self, ValueError> {
        if !(Self::MIN..=Self::MAX).contains(&seconds) {
            return Err(ValueError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                actual: seconds,
            });
        }
        Ok(Self(seconds))
    }

    /// Creates a fan timer from whole minutes (1-5).
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the resulting seconds value is
    /// outside [5, 300].
    pub fn from_minutes(minutes: u16) -> Result<Self, ValueError> {
        Self::new(minutes.saturating_mul(60))
    }

    /// Creates a fan timer, clamping to the valid range.
    #[must_use]
    pub const fn clamped(seconds: u16) -> Self {
        if seconds < Self::MIN {
            Self(Self::MIN)
        } else if seconds > Self::MAX {
            Self(Self::MAX)
        } else {
            Self(seconds)
        }
    }

    /// Returns the timer duration in seconds.
    #[must_use]
    pub const fn seconds(&self) -> u16 {
        self.0
    }

    /// Returns the timer as a [`Duration`].
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.0 as u64)
    }

    /// Returns the duration as a formatted string (e.g., "1m 30s").
    #[must_use]
    pub fn as_formatted(&self) -> String {
        let mins = self.0 / 60;
        let secs = self.0 % 60;
        if mins > 0 && secs > 0 {
            format!("{mins}m {secs}s")
        } else if mins > 0 {
            format!("{mins}m")
        } else {
            format!("{secs}s")
        }
    }
}

impl fmt::Display for FanTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_formatted())
    }
}

impl TryFrom<u16> for FanTimer {
    type Error = ValueError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_timer_valid_values() {
        for v in [5, 36, 60, 120, 300] {
            let timer = FanTimer::new(v).unwrap();
            assert_eq!(timer.seconds(), v);
        }
    }

    #[test]
    fn fan_timer_invalid_values() {
        assert!(FanTimer::new(0).is_err());
        assert!(FanTimer::new(4).is_err());
        assert!(FanTimer::new(301).is_err());
    }

    #[test]
    fn fan_timer_from_minutes() {
        let timer = FanTimer::from_minutes(2).unwrap();
        assert_eq!(timer.seconds(), 120);
    }

    #[test]
    fn fan_timer_from_minutes_invalid() {
        // 6 minutes = 360 seconds > 300
        assert!(FanTimer::from_minutes(6).is_err());
        assert!(FanTimer::from_minutes(0).is_err());
    }

    #[test]
    fn fan_timer_clamped() {
        assert_eq!(FanTimer::clamped(0).seconds(), 5);
        assert_eq!(FanTimer::clamped(60).seconds(), 60);
        assert_eq!(FanTimer::clamped(900).seconds(), 300);
    }

    #[test]
    fn fan_timer_duration() {
        assert_eq!(FanTimer::new(90).unwrap().duration(), Duration::from_secs(90));
    }

    #[test]
    fn fan_timer_as_formatted() {
        assert_eq!(FanTimer::new(30).unwrap().as_formatted(), "30s");
        assert_eq!(FanTimer::new(60).unwrap().as_formatted(), "1m");
        assert_eq!(FanTimer::new(90).unwrap().as_formatted(), "1m 30s");
        assert_eq!(FanTimer::new(300).unwrap().as_formatted(), "5m");
    }

    #[test]
    fn fan_timer_display() {
        assert_eq!(FanTimer::new(90).unwrap().to_string(), "1m 30s");
    }

    #[test]
    fn fan_timer_try_from() {
        let timer: FanTimer = 45u16.try_into().unwrap();
        assert_eq!(timer.seconds(), 45);

        let result: Result<FanTimer, _> = 400u16.try_into();
        assert!(result.is_err());
    }
}
