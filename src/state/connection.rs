// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The state of the physical link to the appliance.
///
/// Owned exclusively by the connection manager; every transition is published
/// on its state channel and on the event bus. The legal transitions are:
///
/// ```text
/// Disconnected --connect()--> Connecting --success--> Connected
/// Connecting   --failure----> Disconnected            (after backoff)
/// Connected    --io error---> Reconnecting --success--> Connected
/// Reconnecting --exhausted--> Disconnected
/// any state    --close()----> Disconnected             (immediate)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No physical link. Reads and writes fail fast with `NotConnected`.
    #[default]
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The link is up and transactions are accepted.
    Connected,
    /// The link dropped mid-operation and recovery is in progress.
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` if transactions are currently accepted.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` while a connect or recovery attempt is running.
    #[must_use]
    pub const fn is_transitioning(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}
