// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan-out channel for device events.
//!
//! The bus is fire-and-forget telemetry, not a durable log: publishing never
//! blocks, events published with no subscribers are dropped, and a subscriber
//! that falls behind loses the oldest events rather than exerting
//! backpressure on the monitor loop.

use tokio::sync::broadcast;

use super::DeviceEvent;

/// Default capacity for the event channel.
///
/// Each subscriber has their own buffer of this size. Slow subscribers lag
/// (dropping oldest events) rather than blocking publishers.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcast channel carrying [`DeviceEvent`]s to any number of subscribers.
///
/// Cloning the bus shares the underlying channel, so events published through
/// any clone reach every subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    /// Creates an event bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an event bus with a custom per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event to all current subscribers.
    ///
    /// With no subscribers the event is silently dropped; missed
    /// notifications are never re-delivered.
    pub fn publish(&self, event: DeviceEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped: no subscribers");
        }
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
