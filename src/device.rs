// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level appliance abstraction.
//!
//! This module provides the unified API for controlling and monitoring the
//! appliance: commands, the live snapshot, events, and usage statistics,
//! all over a host-supplied [`GattLink`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::connection::{ConnectionManager, GattLink, RetryPolicy};
use crate::error::Error;
use crate::event::{DEFAULT_EVENT_CAPACITY, DeviceEvent, EventBus};
use crate::monitor::Monitor;
use crate::poll::{PollPlan, PollPolicy};
use crate::protocol::{Characteristic, codec};
use crate::session::DetectorConfig;
use crate::state::{ConnectionState, DeviceSnapshot};
use crate::stats::{StatisticsRecord, StatisticsStore};
use crate::types::{Preset, Temperature};

/// Everything tunable about a [`Volcano`].
///
/// The defaults match the appliance's behavior in the field; most hosts only
/// ever set [`statistics_path`](Self::statistics_path).
#[derive(Debug, Clone)]
pub struct VolcanoConfig {
    /// Poll cadence rules.
    pub poll: PollPolicy,
    /// Session detection thresholds.
    pub detector: DetectorConfig,
    /// Retry and backoff bounds for the link.
    pub retry: RetryPolicy,
    /// Backing file for usage statistics; `None` keeps them in memory only.
    pub statistics_path: Option<PathBuf>,
    /// Event bus buffer size per subscriber; zero selects the default.
    pub event_capacity: usize,
}

impl Default for VolcanoConfig {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            detector: DetectorConfig::default(),
            retry: RetryPolicy::default(),
            statistics_path: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// A Volcano heating appliance reachable over Bluetooth LE.
///
/// Construction spawns a background monitor that polls telemetry, detects
/// sessions, and keeps statistics; it must therefore happen inside a Tokio
/// runtime. The monitor sleeps while the link is down and stops when the
/// `Volcano` is dropped. Dropping does not close the transport — call
/// [`close`](Self::close) first for an orderly disconnect.
///
/// # Creating a device
///
/// ```ignore
/// use volcano_ble::Volcano;
///
/// let volcano = Volcano::new(my_gatt_link);
/// volcano.connect().await?;
/// volcano.start_session(195).await?;
/// ```
pub struct Volcano<T: GattLink> {
    manager: Arc<ConnectionManager<T>>,
    statistics: Arc<StatisticsStore>,
    bus: EventBus,
    snapshot_rx: watch::Receiver<Option<DeviceSnapshot>>,
    poll: PollPolicy,
    shutdown_tx: watch::Sender<bool>,
}

impl<T: GattLink> Volcano<T> {
    /// Creates a device with default configuration.
    #[must_use]
    pub fn new(link: T) -> Self {
        Self::with_config(link, VolcanoConfig::default())
    }

    /// Creates a device with the specified configuration.
    #[must_use]
    pub fn with_config(link: T, config: VolcanoConfig) -> Self {
        let capacity = if config.event_capacity == 0 {
            DEFAULT_EVENT_CAPACITY
        } else {
            config.event_capacity
        };
        let bus = EventBus::with_capacity(capacity);
        let manager = Arc::new(ConnectionManager::new(link, config.retry, bus.clone()));
        let statistics = Arc::new(match &config.statistics_path {
            Some(path) => StatisticsStore::open(path),
            None => StatisticsStore::in_memory(),
        });
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = Monitor::new(
            Arc::clone(&manager),
            config.poll.clone(),
            config.detector,
            Arc::clone(&statistics),
            bus.clone(),
            snapshot_tx,
            shutdown_rx,
        );
        tokio::spawn(monitor.run());
        Self {
            manager,
            statistics,
            bus,
            snapshot_rx,
            poll: config.poll,
            shutdown_tx,
        }
    }

    // ========== Lifecycle ==========

    /// Establishes the Bluetooth link and starts polling.
    ///
    /// # Errors
    ///
    /// Returns error when every connection attempt failed or the link was
    /// closed mid-establishment.
    pub async fn connect(&self) -> Result<(), Error> {
        self.manager.connect().await?;
        Ok(())
    }

    /// Disconnects, cancelling in-flight operations. Polling pauses until
    /// the next [`connect`](Self::connect).
    pub async fn close(&self) {
        self.manager.close().await;
    }

    /// The current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// A channel observing every connection state change.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.manager.watch_state()
    }

    // ========== Telemetry ==========

    /// The latest decoded snapshot, `None` before the first successful poll.
    #[must_use]
    pub fn snapshot(&self) -> Option<DeviceSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// A channel observing every fresh snapshot.
    #[must_use]
    pub fn watch_snapshot(&self) -> watch::Receiver<Option<DeviceSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Subscribes to the event stream. Each receiver sees every event from
    /// subscription onward; slow receivers lose the oldest events first.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.bus.subscribe()
    }

    /// Current usage statistics.
    #[must_use]
    pub fn statistics(&self) -> StatisticsRecord {
        self.statistics.snapshot()
    }

    /// The poll cadence the monitor would choose for the latest snapshot,
    /// assuming fresh metadata. `None` before the first successful poll.
    #[must_use]
    pub fn poll_plan(&self) -> Option<PollPlan> {
        self.snapshot()
            .map(|snapshot| self.poll.plan(&snapshot, Some(Duration::ZERO)))
    }

    /// A JSON report of the device's observable state, for logs and debug
    /// endpoints.
    #[must_use]
    pub fn diagnostics(&self) -> serde_json::Value {
        serde_json::json!({
            "connection": self.connection_state(),
            "snapshot": self.snapshot(),
            "statistics": self.statistics(),
            "poll_policy": self.poll,
            "retry_policy": self.manager.retry_policy(),
        })
    }

    // ========== Heater Control ==========

    /// Programs the heater setpoint, in whole degrees Celsius.
    ///
    /// # Errors
    ///
    /// Returns error for a setpoint outside the supported envelope, or if
    /// the write fails.
    pub async fn set_target_temperature(&self, celsius: u16) -> Result<(), Error> {
        let payload = codec::encode_set_temperature(celsius)?;
        self.manager
            .write(Characteristic::TargetTemperature, &payload)
            .await?;
        Ok(())
    }

    /// Programs the setpoint from a named preset.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn set_preset(&self, preset: Preset) -> Result<(), Error> {
        self.set_target_temperature(Temperature::from(preset).whole_celsius())
            .await
    }

    /// Switches the heater on or off.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn set_heater(&self, on: bool) -> Result<(), Error> {
        let payload = codec::encode_set_heater(on);
        self.manager
            .write(Characteristic::HeaterFlag, &payload)
            .await?;
        Ok(())
    }

    /// Programs the setpoint and switches the heater on in one call.
    ///
    /// # Errors
    ///
    /// Returns error for a setpoint outside the supported envelope, or if
    /// either write fails.
    pub async fn start_session(&self, celsius: u16) -> Result<(), Error> {
        self.set_target_temperature(celsius).await?;
        self.set_heater(true).await
    }

    // ========== Fan Control ==========

    /// Switches the airflow fan on or off.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn set_fan(&self, on: bool) -> Result<(), Error> {
        let payload = codec::encode_set_fan(on);
        self.manager
            .write(Characteristic::FanFlag, &payload)
            .await?;
        Ok(())
    }

    /// Programs the fan auto-stop timer, in seconds.
    ///
    /// # Errors
    ///
    /// Returns error for a duration outside the supported range, or if the
    /// write fails.
    pub async fn set_fan_timer(&self, seconds: u16) -> Result<(), Error> {
        let payload = codec::encode_set_fan_timer(seconds)?;
        self.manager
            .write(Characteristic::FanTimer, &payload)
            .await?;
        Ok(())
    }

    // ========== Display Control ==========

    /// Sets the LED display brightness, as a percentage.
    ///
    /// # Errors
    ///
    /// Returns error for a percentage above 100, or if the write fails.
    pub async fn set_brightness(&self, percent: u8) -> Result<(), Error> {
        let payload = codec::encode_set_brightness(percent)?;
        self.manager
            .write(Characteristic::Brightness, &payload)
            .await?;
        Ok(())
    }

    // ========== Notifications ==========

    /// Invokes the callback for every pushed chamber temperature
    /// notification, decoded. Undecodable payloads are dropped.
    ///
    /// The underlying subscription is re-armed automatically after a
    /// reconnect and stays registered for the life of the device.
    ///
    /// # Errors
    ///
    /// Returns error when arming the subscription over a live link fails;
    /// the callback stays registered and is re-armed on the next connect.
    pub async fn on_temperature_changed<F>(&self, callback: F) -> Result<(), Error>
    where
        F: Fn(Temperature) + Send + Sync + 'static,
    {
        self.manager
            .subscribe(Characteristic::CurrentTemperature, move |payload| {
                match codec::decode_temperature(Characteristic::CurrentTemperature, payload) {
                    Ok(temperature) => callback(temperature),
                    Err(e) => {
                        tracing::debug!(error = %e, "undecodable temperature notification");
                    }
                }
            })
            .await?;
        Ok(())
    }
}

impl<T: GattLink> Drop for Volcano<T> {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
