// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Link lifecycle: the transport seam, retry configuration, and the
//! connection manager that serializes all GATT traffic.

mod manager;
mod retry;
mod transport;

pub use manager::ConnectionManager;
pub use retry::RetryPolicy;
pub use transport::GattLink;
