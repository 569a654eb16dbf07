// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ownership of the transport: one transaction at a time, retries, and
//! automatic recovery of a dropped link.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc, watch};

use crate::error::LinkError;
use crate::event::{DeviceEvent, EventBus};
use crate::protocol::Characteristic;
use crate::state::ConnectionState;

use super::retry::RetryPolicy;
use super::transport::GattLink;

type NotifyCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Callbacks keyed by characteristic, with arming tracked per characteristic
/// so the transport sees at most one subscription each.
#[derive(Default)]
struct NotifyRegistry {
    callbacks: RwLock<HashMap<Characteristic, Vec<NotifyCallback>>>,
}

impl NotifyRegistry {
    /// Returns `true` when this is the first callback for the characteristic,
    /// meaning the transport subscription still has to be armed.
    fn register(&self, characteristic: Characteristic, callback: NotifyCallback) -> bool {
        let mut map = self.callbacks.write();
        let slot = map.entry(characteristic).or_default();
        slot.push(callback);
        slot.len() == 1
    }

    fn dispatch(&self, characteristic: Characteristic, payload: &[u8]) {
        for callback in self.callbacks.read().get(&characteristic).into_iter().flatten() {
            callback(payload);
        }
    }

    fn characteristics(&self) -> Vec<Characteristic> {
        self.callbacks.read().keys().copied().collect()
    }
}

/// Serializes all traffic to a [`GattLink`] and keeps the link alive.
///
/// Every read and write takes the internal transaction gate, runs under the
/// policy's deadline, and is retried on transient failures. When retries are
/// exhausted the manager degrades to [`ConnectionState::Reconnecting`] and
/// tries to reopen the link in place, still holding the gate, so queued
/// transactions only run once the link has settled either way.
///
/// All state changes are published on the event bus and observable through
/// [`watch_state`](Self::watch_state).
pub struct ConnectionManager<T: GattLink> {
    link: Mutex<T>,
    state_tx: watch::Sender<ConnectionState>,
    policy: RetryPolicy,
    bus: EventBus,
    notifications: Arc<NotifyRegistry>,
}

impl<T: GattLink> ConnectionManager<T> {
    /// Wraps a transport. The link starts out
    /// [`Disconnected`](ConnectionState::Disconnected); call
    /// [`connect`](Self::connect) to bring it up.
    pub fn new(link: T, policy: RetryPolicy, bus: EventBus) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            link: Mutex::new(link),
            state_tx,
            policy,
            bus,
            notifications: Arc::new(NotifyRegistry::default()),
        }
    }

    /// The current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// A channel that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The policy this manager retries under.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // ========== Lifecycle ==========

    /// Establishes the link, retrying with backoff up to the policy's
    /// connect attempts.
    ///
    /// Concurrent calls collapse into one: callers that find an establishment
    /// already in flight wait for its outcome instead of racing the radio.
    /// Calling on an already-connected manager is a no-op.
    ///
    /// # Errors
    ///
    /// [`LinkError::Exhausted`] when every attempt failed, or
    /// [`LinkError::NotConnected`] when [`close`](Self::close) interrupted
    /// the establishment.
    pub async fn connect(&self) -> Result<(), LinkError> {
        if !self.try_transition(ConnectionState::Disconnected, ConnectionState::Connecting) {
            return self.await_settled().await;
        }
        let mut link = self.link.lock().await;
        let attempts = self.policy.connect_attempts.max(1);
        for attempt in 1..=attempts {
            match self.open_attempt(&mut link, ConnectionState::Connecting).await {
                None => return Err(LinkError::NotConnected),
                Some(Ok(())) => {
                    self.arm_notifications(&mut link).await;
                    if self.try_transition(ConnectionState::Connecting, ConnectionState::Connected)
                    {
                        tracing::info!("link established");
                        return Ok(());
                    }
                    // Closed while we were opening; tear the fresh link down.
                    link.close().await;
                    return Err(LinkError::NotConnected);
                }
                Some(Err(e)) => tracing::debug!(attempt, error = %e, "connection attempt failed"),
            }
            if attempt < attempts && self.backoff(attempt).await.is_err() {
                return Err(LinkError::NotConnected);
            }
        }
        self.force_disconnected();
        Err(LinkError::Exhausted { attempts })
    }

    /// Closes the link and cancels anything in flight.
    ///
    /// In-flight transactions, establishment and recovery attempts, and
    /// backoff waits all observe the state change and bail out with
    /// [`LinkError::NotConnected`] before the transport itself is torn down.
    pub async fn close(&self) {
        let was = self.state();
        self.force_disconnected();
        let mut link = self.link.lock().await;
        link.close().await;
        if was != ConnectionState::Disconnected {
            tracing::info!("link closed");
        }
    }

    // ========== Transactions ==========

    /// Reads a characteristic through the transaction gate.
    ///
    /// # Errors
    ///
    /// [`LinkError::NotConnected`] without touching the transport when the
    /// link is down; [`LinkError::Exhausted`] after the configured attempts,
    /// at which point the link has already degraded and settled; any
    /// non-transient transport error immediately.
    pub async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>, LinkError> {
        self.ensure_connected()?;
        let mut link = self.link.lock().await;
        self.ensure_connected()?;
        let attempts = self.policy.io_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.bounded(link.read(characteristic)).await {
                Ok(payload) => return Ok(payload),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt < attempts => {
                    tracing::debug!(%characteristic, attempt, error = %e, "read failed, retrying");
                    self.backoff(attempt).await?;
                }
                Err(e) => {
                    tracing::warn!(%characteristic, attempts = attempt, error = %e, "read retries exhausted");
                    self.degrade(&mut link).await;
                    return Err(LinkError::Exhausted { attempts: attempt });
                }
            }
        }
    }

    /// Writes a payload to a characteristic through the transaction gate.
    ///
    /// # Errors
    ///
    /// Same contract as [`read`](Self::read).
    pub async fn write(
        &self,
        characteristic: Characteristic,
        payload: &[u8],
    ) -> Result<(), LinkError> {
        self.ensure_connected()?;
        let mut link = self.link.lock().await;
        self.ensure_connected()?;
        let attempts = self.policy.io_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.bounded(link.write(characteristic, payload)).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt < attempts => {
                    tracing::debug!(%characteristic, attempt, error = %e, "write failed, retrying");
                    self.backoff(attempt).await?;
                }
                Err(e) => {
                    tracing::warn!(%characteristic, attempts = attempt, error = %e, "write retries exhausted");
                    self.degrade(&mut link).await;
                    return Err(LinkError::Exhausted { attempts: attempt });
                }
            }
        }
    }

    // ========== Notifications ==========

    /// Registers a callback for raw notification payloads on a
    /// characteristic.
    ///
    /// The transport subscription is armed on first registration per
    /// characteristic and re-armed automatically after every reconnect.
    /// Registering while disconnected succeeds; arming then happens on the
    /// next connect.
    ///
    /// # Errors
    ///
    /// Fails only when arming a fresh subscription over a live link fails;
    /// the callback stays registered regardless and is re-armed on the next
    /// connect.
    pub async fn subscribe<F>(
        &self,
        characteristic: Characteristic,
        callback: F,
    ) -> Result<(), LinkError>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let newly_registered = self.notifications.register(characteristic, Arc::new(callback));
        if !newly_registered || !self.state().is_connected() {
            return Ok(());
        }
        let mut link = self.link.lock().await;
        if !self.state().is_connected() {
            return Ok(());
        }
        match self.bounded(link.subscribe(characteristic)).await {
            Ok(stream) => {
                self.spawn_forwarder(characteristic, stream);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%characteristic, error = %e, "failed to arm notifications");
                Err(e)
            }
        }
    }

    /// Arms transport subscriptions for every registered characteristic.
    /// Runs on a freshly opened link, before it is announced as connected.
    async fn arm_notifications(&self, link: &mut T) {
        for characteristic in self.notifications.characteristics() {
            match tokio::time::timeout(self.policy.io_timeout, link.subscribe(characteristic)).await
            {
                Ok(Ok(stream)) => self.spawn_forwarder(characteristic, stream),
                Ok(Err(e)) => {
                    tracing::warn!(%characteristic, error = %e, "failed to arm notifications");
                }
                Err(_) => tracing::warn!(%characteristic, "arming notifications timed out"),
            }
        }
    }

    /// Pumps one notification stream into the registry until the stream
    /// closes. Payloads arriving while the link is not settled are dropped.
    fn spawn_forwarder(&self, characteristic: Characteristic, mut stream: mpsc::Receiver<Vec<u8>>) {
        let registry = Arc::clone(&self.notifications);
        let state_rx = self.state_tx.subscribe();
        tokio::spawn(async move {
            while let Some(payload) = stream.recv().await {
                if state_rx.borrow().is_connected() {
                    registry.dispatch(characteristic, &payload);
                } else {
                    tracing::trace!(%characteristic, "dropped notification while not connected");
                }
            }
        });
    }

    // ========== Internals ==========

    /// Recovers a link whose transactions keep failing.
    ///
    /// Runs with the transaction gate held: the failing caller drives the
    /// recovery to completion, so by the time its error surfaces the state
    /// has settled as either `Connected` or `Disconnected`.
    async fn degrade(&self, link: &mut T) {
        if !self.try_transition(ConnectionState::Connected, ConnectionState::Reconnecting) {
            return;
        }
        link.close().await;
        let attempts = self.policy.reconnect_attempts.max(1);
        for attempt in 1..=attempts {
            match self.open_attempt(link, ConnectionState::Reconnecting).await {
                None => return,
                Some(Ok(())) => {
                    self.arm_notifications(link).await;
                    if self.try_transition(
                        ConnectionState::Reconnecting,
                        ConnectionState::Connected,
                    ) {
                        tracing::info!(attempt, "link recovered");
                    } else {
                        link.close().await;
                    }
                    return;
                }
                Some(Err(e)) => tracing::debug!(attempt, error = %e, "reopen failed"),
            }
            if attempt < attempts && self.backoff(attempt).await.is_err() {
                return;
            }
        }
        tracing::warn!(attempts, "link recovery exhausted");
        self.force_disconnected();
    }

    /// Runs one open attempt under the establishment deadline. Returns `None`
    /// when the expected state was replaced from outside, which means the
    /// manager was closed and the attempt must be abandoned.
    async fn open_attempt(
        &self,
        link: &mut T,
        expect: ConnectionState,
    ) -> Option<Result<(), LinkError>> {
        let mut state_rx = self.state_tx.subscribe();
        tokio::select! {
            result = tokio::time::timeout(self.policy.connect_timeout, link.open()) => match result {
                Ok(inner) => Some(inner),
                Err(_) => Some(Err(LinkError::Timeout(self.policy.connect_timeout_millis()))),
            },
            _ = state_rx.wait_for(move |s| *s != expect) => None,
        }
    }

    /// Races a transport future against the transaction deadline and against
    /// the link being closed from outside.
    async fn bounded<F, O>(&self, io: F) -> Result<O, LinkError>
    where
        F: Future<Output = Result<O, LinkError>>,
    {
        let mut state_rx = self.state_tx.subscribe();
        tokio::select! {
            result = tokio::time::timeout(self.policy.io_timeout, io) => match result {
                Ok(inner) => inner,
                Err(_) => Err(LinkError::Timeout(self.policy.io_timeout_millis())),
            },
            _ = state_rx.wait_for(|s| *s == ConnectionState::Disconnected) => {
                Err(LinkError::NotConnected)
            }
        }
    }

    /// Waits out a backoff delay, abandoning the wait if the manager is
    /// closed meanwhile.
    async fn backoff(&self, attempt: u32) -> Result<(), LinkError> {
        let delay = self.policy.backoff_for_attempt(attempt);
        let mut state_rx = self.state_tx.subscribe();
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            _ = state_rx.wait_for(|s| *s == ConnectionState::Disconnected) => {
                Err(LinkError::NotConnected)
            }
        }
    }

    /// Waits for an in-flight establishment to settle one way or the other.
    async fn await_settled(&self) -> Result<(), LinkError> {
        let mut rx = self.state_tx.subscribe();
        let settled = rx
            .wait_for(|s| {
                matches!(
                    s,
                    ConnectionState::Connected | ConnectionState::Disconnected
                )
            })
            .await
            .map(|s| *s);
        match settled {
            Ok(ConnectionState::Connected) => Ok(()),
            _ => Err(LinkError::NotConnected),
        }
    }

    fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.state().is_connected() {
            Ok(())
        } else {
            Err(LinkError::NotConnected)
        }
    }

    fn force_disconnected(&self) {
        self.set_state_if(|_| true, ConnectionState::Disconnected);
    }

    fn try_transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.set_state_if(|current| current == from, to)
    }

    /// The single point where connection state changes. The compare-and-set
    /// through the watch channel keeps concurrent transitions serialized, and
    /// every actual change is published on the bus.
    fn set_state_if(
        &self,
        allowed: impl Fn(ConnectionState) -> bool,
        to: ConnectionState,
    ) -> bool {
        let changed = self.state_tx.send_if_modified(|state| {
            if allowed(*state) && *state != to {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::debug!(state = %to, "connection state changed");
            self.bus.publish(DeviceEvent::ConnectionChanged {
                timestamp: chrono::Utc::now(),
                state: to,
            });
        }
        changed
    }
}
