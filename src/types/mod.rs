// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constrained value types for appliance settings.
//!
//! Every type in this module validates its range at construction, so a value
//! that exists is a value the appliance accepts. Command encoding consumes
//! these types; invalid input is rejected before any Bluetooth I/O happens.

mod brightness;
mod fan_timer;
mod temperature;

pub use brightness::Brightness;
pub use fan_timer::FanTimer;
pub use temperature::{Preset, Temperature};
