// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifetime and daily usage counters with a rolling duration average.

mod store;

pub use store::{ROLLING_WINDOW, StatisticsRecord, StatisticsStore};
