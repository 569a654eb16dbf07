// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Degraded-link behavior through the public API: in-place recovery,
//! exhaustion into `Disconnected`, and host-driven resume.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use volcano_ble::{
    Characteristic, ConnectionState, DeviceEvent, GattLink, LinkError, RetryPolicy, Volcano,
    VolcanoConfig,
};

/// Transport that serves a fixed idle appliance but can be told to fail the
/// next N reads or opens.
#[derive(Clone, Default)]
struct FlakyLink {
    reads: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
    read_failures: Arc<AtomicUsize>,
    open_failures: Arc<AtomicUsize>,
}

impl FlakyLink {
    fn take_budget(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
    }
}

impl GattLink for FlakyLink {
    async fn open(&mut self) -> Result<(), LinkError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if Self::take_budget(&self.open_failures) {
            return Err(LinkError::Transport("adapter busy".to_string()));
        }
        Ok(())
    }

    async fn close(&mut self) {}

    async fn read(&mut self, characteristic: Characteristic) -> Result<Vec<u8>, LinkError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if Self::take_budget(&self.read_failures) {
            return Err(LinkError::Transport("GATT read failed".to_string()));
        }
        Ok(match characteristic {
            Characteristic::CurrentTemperature => 300_u16.to_le_bytes().to_vec(),
            Characteristic::TargetTemperature => 0_u16.to_le_bytes().to_vec(),
            Characteristic::HeaterFlag | Characteristic::FanFlag => vec![0],
            Characteristic::Brightness => vec![70],
            Characteristic::FanTimer => 36_u16.to_le_bytes().to_vec(),
            Characteristic::OperationTime => 100_u32.to_le_bytes().to_vec(),
            Characteristic::Firmware | Characteristic::BleFirmware => b"V01.23\0\0".to_vec(),
            Characteristic::SerialNumber => b"VH000001\0\0".to_vec(),
        })
    }

    async fn write(&mut self, _c: Characteristic, _payload: &[u8]) -> Result<(), LinkError> {
        Ok(())
    }

    async fn subscribe(
        &mut self,
        _c: Characteristic,
    ) -> Result<mpsc::Receiver<Vec<u8>>, LinkError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        io_attempts: 3,
        io_timeout: Duration::from_millis(200),
        connect_attempts: 2,
        connect_timeout: Duration::from_millis(500),
        reconnect_attempts: 2,
        initial_backoff: Duration::from_millis(20),
        max_backoff: Duration::from_millis(200),
        backoff_multiplier: 2.0,
    }
}

fn flaky_volcano(link: FlakyLink) -> Volcano<FlakyLink> {
    Volcano::with_config(
        link,
        VolcanoConfig {
            retry: fast_retry(),
            ..VolcanoConfig::default()
        },
    )
}

fn connection_states(
    events: &mut tokio::sync::broadcast::Receiver<DeviceEvent>,
) -> Vec<ConnectionState> {
    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DeviceEvent::ConnectionChanged { state, .. } = event {
            states.push(state);
        }
    }
    states
}

#[tokio::test(start_paused = true)]
async fn exhausted_reads_recover_in_place_and_polling_continues() {
    let link = FlakyLink::default();
    let volcano = flaky_volcano(link.clone());
    let mut events = volcano.events();

    volcano.connect().await.unwrap();
    let mut snapshots = volcano.watch_snapshot();
    snapshots.wait_for(Option::is_some).await.unwrap();

    // Fail one full read budget: the next poll cycle degrades the link and
    // reopens it without host involvement.
    link.read_failures.store(3, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(
        connection_states(&mut events),
        [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Connected,
        ]
    );
    assert_eq!(volcano.connection_state(), ConnectionState::Connected);

    // The last good snapshot survived the outage and polling carries on.
    assert!(volcano.snapshot().is_some());
    let before = link.reads.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(link.reads.load(Ordering::SeqCst) > before);
}

#[tokio::test(start_paused = true)]
async fn reopen_exhaustion_parks_the_device_until_the_host_reconnects() {
    let link = FlakyLink::default();
    let volcano = flaky_volcano(link.clone());
    let mut events = volcano.events();

    volcano.connect().await.unwrap();
    let mut snapshots = volcano.watch_snapshot();
    snapshots.wait_for(Option::is_some).await.unwrap();

    // Fail the reads and every reopen attempt: recovery cannot succeed and
    // the device settles Disconnected.
    link.read_failures.store(3, Ordering::SeqCst);
    link.open_failures.store(10, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(volcano.connection_state(), ConnectionState::Disconnected);
    assert_eq!(
        connection_states(&mut events),
        [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Disconnected,
        ]
    );

    // Parked: no polling happens while the device stays disconnected, but
    // the last snapshot is still readable.
    let before = link.reads.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(link.reads.load(Ordering::SeqCst), before);
    assert!(volcano.snapshot().is_some());

    // An explicit reconnect brings polling back.
    link.open_failures.store(0, Ordering::SeqCst);
    volcano.connect().await.unwrap();
    assert_eq!(volcano.connection_state(), ConnectionState::Connected);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(link.reads.load(Ordering::SeqCst) > before);
}

#[tokio::test(start_paused = true)]
async fn close_pauses_polling_until_the_next_connect() {
    let link = FlakyLink::default();
    let volcano = flaky_volcano(link.clone());

    volcano.connect().await.unwrap();
    let mut snapshots = volcano.watch_snapshot();
    snapshots.wait_for(Option::is_some).await.unwrap();

    volcano.close().await;
    assert_eq!(volcano.connection_state(), ConnectionState::Disconnected);

    let before = link.reads.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(link.reads.load(Ordering::SeqCst), before);

    volcano.connect().await.unwrap();
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(link.reads.load(Ordering::SeqCst) > before);
}
