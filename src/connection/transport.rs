// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The host-supplied Bluetooth transport boundary.
//!
//! This crate contains no platform Bluetooth stack. The host implements
//! [`GattLink`] over whatever BLE machinery its platform offers and hands it
//! to the connection manager, which owns it for the rest of its life. The
//! methods are declared as `impl Future … + Send` rather than `async fn` so
//! the manager's background work can be spawned onto a multi-threaded
//! runtime; implementations can still use plain `async fn` syntax.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::LinkError;
use crate::protocol::Characteristic;

/// A physical GATT session with the appliance.
///
/// The connection manager serializes every call, so implementations never see
/// concurrent transactions and are free to assume exclusive access to the
/// radio. All waiting is bounded by the manager's timeouts; implementations
/// may block indefinitely and rely on being raced against a deadline.
///
/// # Examples
///
/// ```
/// use tokio::sync::mpsc;
/// use volcano_ble::{Characteristic, GattLink, LinkError};
///
/// struct NullLink;
///
/// impl GattLink for NullLink {
///     async fn open(&mut self) -> Result<(), LinkError> {
///         Err(LinkError::Transport("no radio".into()))
///     }
///
///     async fn close(&mut self) {}
///
///     async fn read(&mut self, _c: Characteristic) -> Result<Vec<u8>, LinkError> {
///         Err(LinkError::NotConnected)
///     }
///
///     async fn write(&mut self, _c: Characteristic, _payload: &[u8]) -> Result<(), LinkError> {
///         Err(LinkError::NotConnected)
///     }
///
///     async fn subscribe(
///         &mut self,
///         _c: Characteristic,
///     ) -> Result<mpsc::Receiver<Vec<u8>>, LinkError> {
///         Err(LinkError::NotConnected)
///     }
/// }
/// ```
pub trait GattLink: Send + 'static {
    /// Establishes the physical session: scan/locate, connect, and resolve
    /// the service's characteristics.
    ///
    /// Called on a closed link; also called again after [`close`](Self::close)
    /// when the manager recovers a dropped connection.
    fn open(&mut self) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Tears the physical session down. Must be safe to call at any time,
    /// including on an already-closed link.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Reads the current value of a characteristic.
    fn read(
        &mut self,
        characteristic: Characteristic,
    ) -> impl Future<Output = Result<Vec<u8>, LinkError>> + Send;

    /// Writes a payload to a characteristic.
    fn write(
        &mut self,
        characteristic: Characteristic,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Enables notifications for a characteristic.
    ///
    /// The returned channel yields raw notification payloads and closes when
    /// the physical session drops; the manager re-subscribes after a
    /// successful reconnect.
    fn subscribe(
        &mut self,
        characteristic: Characteristic,
    ) -> impl Future<Output = Result<mpsc::Receiver<Vec<u8>>, LinkError>> + Send;
}
