// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retry and backoff configuration for the connection manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds on how hard the connection manager tries before giving up.
///
/// Attempt counts are treated as at least one: a policy of zero attempts
/// still performs a single try.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts per read or write transaction before the link degrades.
    pub io_attempts: u32,
    /// Deadline for a single read or write transaction.
    pub io_timeout: Duration,
    /// Attempts for an explicit `connect()` call.
    pub connect_attempts: u32,
    /// Deadline for a single session establishment, including discovery.
    pub connect_timeout: Duration,
    /// Reopen attempts when recovering a degraded link.
    pub reconnect_attempts: u32,
    /// Delay before the second attempt of any retried operation.
    pub initial_backoff: Duration,
    /// Upper bound on the exponential backoff.
    pub max_backoff: Duration,
    /// Growth factor between consecutive backoff delays.
    pub backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            io_attempts: 3,
            io_timeout: Duration::from_secs(2),
            connect_attempts: 3,
            connect_timeout: Duration::from_secs(10),
            reconnect_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to wait after the given failed attempt
    /// (1-based), growing exponentially up to [`max_backoff`](Self::max_backoff).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_backoff.min(self.max_backoff);
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let seconds = self.initial_backoff.as_secs_f32() * factor;
        Duration::from_secs_f32(seconds.min(self.max_backoff.as_secs_f32()))
    }

    /// The transaction deadline in milliseconds, as reported by
    /// [`LinkError::Timeout`](crate::LinkError::Timeout).
    #[must_use]
    pub fn io_timeout_millis(&self) -> u64 {
        u64::try_from(self.io_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// The establishment deadline in milliseconds.
    #[must_use]
    pub fn connect_timeout_millis(&self) -> u64 {
        u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
