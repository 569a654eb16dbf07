// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event notifications: the record shape and the fan-out bus.

mod device_event;
mod event_bus;

pub use device_event::DeviceEvent;
pub use event_bus::{DEFAULT_EVENT_CAPACITY, EventBus};
