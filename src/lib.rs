// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control and monitor a Volcano heating appliance over Bluetooth LE.
//!
//! The appliance speaks a small GATT protocol: fixed-point temperatures,
//! single-byte switch flags, and NUL-padded identity strings. This crate
//! turns that into a typed async API with session tracking on top:
//!
//! - **Transport-agnostic**: bring your own BLE stack through the
//!   [`GattLink`] trait; the crate contains no platform Bluetooth code
//! - **Serialized link ownership**: one transaction at a time, with bounded
//!   timeouts, transparent retries, and in-place recovery of dropped links
//! - **Adaptive polling**: a second apart while the fan runs or the chamber
//!   closes in on the target, relaxed while the appliance sits idle
//! - **Session tracking**: a deterministic state machine turns raw telemetry
//!   into session starts, target-reached instants, fan cycles, and session
//!   summaries
//! - **Durable statistics**: lifetime and daily counters plus a rolling
//!   duration average, persisted across restarts
//! - **Typed events**: every transition published on a broadcast bus as
//!   flat, JSON-ready records
//!
//! # Quick start
//!
//! Implement [`GattLink`] over your platform's BLE machinery, then hand it
//! to [`Volcano`]:
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use volcano_ble::{Characteristic, GattLink, LinkError, Preset, Volcano};
//!
//! struct MyLink;
//!
//! impl GattLink for MyLink {
//!     async fn open(&mut self) -> Result<(), LinkError> {
//!         todo!("scan, connect, resolve the service")
//!     }
//!
//!     async fn close(&mut self) {}
//!
//!     async fn read(&mut self, _characteristic: Characteristic) -> Result<Vec<u8>, LinkError> {
//!         todo!()
//!     }
//!
//!     async fn write(
//!         &mut self,
//!         _characteristic: Characteristic,
//!         _payload: &[u8],
//!     ) -> Result<(), LinkError> {
//!         todo!()
//!     }
//!
//!     async fn subscribe(
//!         &mut self,
//!         _characteristic: Characteristic,
//!     ) -> Result<mpsc::Receiver<Vec<u8>>, LinkError> {
//!         todo!()
//!     }
//! }
//!
//! # async fn run() -> Result<(), volcano_ble::Error> {
//! let volcano = Volcano::new(MyLink);
//! volcano.connect().await?;
//! volcano.set_preset(Preset::Balanced).await?;
//!
//! let mut events = volcano.events();
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The background monitor keeps [`Volcano::snapshot`] fresh, recognizes
//! sessions, and records them into [`Volcano::statistics`] without further
//! involvement from the host.

mod connection;
mod device;
mod error;
mod event;
mod monitor;
mod poll;
mod protocol;
mod session;
mod state;
mod stats;
mod types;

pub use connection::{ConnectionManager, GattLink, RetryPolicy};
pub use device::{Volcano, VolcanoConfig};
pub use error::{DecodeError, Error, LinkError, Result, StoreError, ValueError};
pub use event::{DEFAULT_EVENT_CAPACITY, DeviceEvent, EventBus};
pub use poll::{PollPlan, PollPolicy};
pub use protocol::{Characteristic, SERVICE_UUID, codec};
pub use session::{Detection, DetectorConfig, Session, SessionDetector, SessionPhase};
pub use state::{ConnectionState, DeviceSnapshot};
pub use stats::{ROLLING_WINDOW, StatisticsRecord, StatisticsStore};
pub use types::{Brightness, FanTimer, Preset, Temperature};
