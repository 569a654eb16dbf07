// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The background task behind [`Volcano`](crate::Volcano): polls the
//! appliance on an adaptive cadence, decodes snapshots, drives the session
//! detector, and fans the results out to the watch channel, the event bus,
//! and the statistics store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::connection::{ConnectionManager, GattLink};
use crate::error::LinkError;
use crate::event::EventBus;
use crate::poll::{PollPlan, PollPolicy};
use crate::protocol::{Characteristic, codec};
use crate::session::{DetectorConfig, SessionDetector};
use crate::state::{ConnectionState, DeviceSnapshot};
use crate::stats::StatisticsStore;

pub(crate) struct Monitor<T: GattLink> {
    manager: Arc<ConnectionManager<T>>,
    policy: PollPolicy,
    detector: SessionDetector,
    statistics: Arc<StatisticsStore>,
    bus: EventBus,
    snapshot_tx: watch::Sender<Option<DeviceSnapshot>>,
    shutdown: watch::Receiver<bool>,
    last_metadata_fetch: Option<Instant>,
}

impl<T: GattLink> Monitor<T> {
    pub(crate) fn new(
        manager: Arc<ConnectionManager<T>>,
        policy: PollPolicy,
        detector_config: DetectorConfig,
        statistics: Arc<StatisticsStore>,
        bus: EventBus,
        snapshot_tx: watch::Sender<Option<DeviceSnapshot>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            manager,
            policy,
            detector: SessionDetector::new(detector_config),
            statistics,
            bus,
            snapshot_tx,
            shutdown,
            last_metadata_fetch: None,
        }
    }

    /// Runs until the shutdown signal fires. While the link is down the
    /// loop parks instead of polling; an explicit reconnect resumes it.
    pub(crate) async fn run(mut self) {
        tracing::debug!("monitor started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            if self.manager.state() == ConnectionState::Disconnected {
                if self.park_until_connected().await {
                    continue;
                }
                break;
            }
            let plan = self.current_plan();
            self.poll_cycle(plan.fetch_metadata).await;
            let interval = self.current_plan().interval;
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                _ = self.shutdown.changed() => {}
            }
        }
        tracing::debug!("monitor stopped");
    }

    /// Waits for the link to come back, or for shutdown. Returns `false`
    /// when the monitor should exit.
    async fn park_until_connected(&mut self) -> bool {
        let mut state_rx = self.manager.watch_state();
        tokio::select! {
            result = state_rx.wait_for(|s| *s != ConnectionState::Disconnected) => result.is_ok(),
            _ = self.shutdown.changed() => false,
        }
    }

    /// The plan for the upcoming cycle, derived from the latest snapshot.
    /// Before the first successful poll everything is due.
    fn current_plan(&self) -> PollPlan {
        let latest = self.snapshot_tx.borrow();
        latest.as_ref().map_or(
            PollPlan {
                interval: self.policy.idle_interval,
                fetch_metadata: true,
            },
            |snapshot| self.policy.plan(snapshot, self.metadata_age()),
        )
    }

    fn metadata_age(&self) -> Option<Duration> {
        self.last_metadata_fetch.map(|at| at.elapsed())
    }

    /// One poll: read, decode, detect, publish. Failures never escape; an
    /// undecodable payload skips the cycle and keeps the previous snapshot,
    /// and link failures have already settled the connection state by the
    /// time they surface here.
    async fn poll_cycle(&mut self, fetch_metadata: bool) {
        let reads = match self.fetch_reads(fetch_metadata).await {
            Ok(reads) => reads,
            Err(e) => {
                tracing::debug!(error = %e, "poll cycle failed");
                return;
            }
        };
        let mut snapshot = match codec::decode_snapshot(&reads, Utc::now()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable poll cycle");
                return;
            }
        };
        if Characteristic::METADATA
            .iter()
            .all(|characteristic| reads.contains_key(characteristic))
        {
            self.last_metadata_fetch = Some(Instant::now());
        }
        if let Some(previous) = self.snapshot_tx.borrow().as_ref() {
            snapshot.inherit_metadata(previous);
        }

        let detection = self.detector.observe(&snapshot);
        self.snapshot_tx.send_replace(Some(snapshot));
        for event in detection.events {
            self.bus.publish(event);
        }
        if let Some(session) = detection.completed {
            if let Err(e) = self.statistics.record_session(&session) {
                tracing::error!(error = %e, "failed to persist session statistics");
            }
        }
    }

    /// Reads the telemetry characteristics, plus metadata when due. A
    /// telemetry failure abandons the cycle; a metadata failure only loses
    /// the refresh, the cached values stay in use.
    async fn fetch_reads(
        &self,
        include_metadata: bool,
    ) -> Result<HashMap<Characteristic, Vec<u8>>, LinkError> {
        let mut reads = HashMap::new();
        for characteristic in Characteristic::TELEMETRY {
            let payload = self.manager.read(characteristic).await?;
            reads.insert(characteristic, payload);
        }
        if include_metadata {
            for characteristic in Characteristic::METADATA {
                match self.manager.read(characteristic).await {
                    Ok(payload) => {
                        reads.insert(characteristic, payload);
                    }
                    Err(e) => {
                        tracing::debug!(%characteristic, error = %e, "metadata read failed");
                        break;
                    }
                }
            }
        }
        Ok(reads)
    }
}
