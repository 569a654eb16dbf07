// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol: the characteristic table and the payload codec.
//!
//! Everything here is pure data translation. The connection layer moves the
//! bytes; this module decides what they mean.

mod characteristic;
pub mod codec;

pub use characteristic::{Characteristic, SERVICE_UUID};
