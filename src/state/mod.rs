// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared state records: the connection lifecycle and the latest telemetry
//! sample.

mod connection;
mod snapshot;

pub use connection::ConnectionState;
pub use snapshot::DeviceSnapshot;
