// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session records and the detector that produces them.

mod detector;
mod record;

pub use detector::{Detection, DetectorConfig, SessionDetector, SessionPhase};
pub use record::Session;
