//! Test utilities for deterministic session tests
//!
//! Provides a radio whose start completions are released by the test, and helpers for
//! collecting the events a session publishes.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beaconcast_ble::{AdvertiseSettings, Advertiser, FaultReporter};
use beaconcast_core::{AdvertisementPayload, ErrorCode, EventKind, SessionEvent, SessionState};
use tokio::sync::{mpsc, watch};

// ----------------------------------------------------------------------------
// Gated Advertiser
// ----------------------------------------------------------------------------

#[derive(Default)]
struct GateLog {
    starts: Vec<AdvertisementPayload>,
    stops: usize,
    reporters: Vec<FaultReporter>,
    on_air: bool,
}

/// Radio whose starts block until the test releases them
pub struct GatedAdvertiser {
    log: Arc<Mutex<GateLog>>,
    results: mpsc::UnboundedReceiver<Result<(), ErrorCode>>,
    start_count: watch::Sender<usize>,
}

/// Test-side control of a [`GatedAdvertiser`]
#[derive(Clone)]
pub struct GateControl {
    log: Arc<Mutex<GateLog>>,
    results: mpsc::UnboundedSender<Result<(), ErrorCode>>,
    start_count: watch::Receiver<usize>,
}

pub fn gated_advertiser() -> (GatedAdvertiser, GateControl) {
    let log = Arc::new(Mutex::new(GateLog::default()));
    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let (count_tx, count_rx) = watch::channel(0);
    (
        GatedAdvertiser {
            log: log.clone(),
            results: results_rx,
            start_count: count_tx,
        },
        GateControl {
            log,
            results: results_tx,
            start_count: count_rx,
        },
    )
}

#[async_trait]
impl Advertiser for GatedAdvertiser {
    async fn start_advertising(
        &mut self,
        payload: &AdvertisementPayload,
        _settings: &AdvertiseSettings,
        faults: FaultReporter,
    ) -> Result<(), ErrorCode> {
        let count = {
            let mut log = self.log.lock().unwrap();
            log.starts.push(payload.clone());
            log.reporters.push(faults);
            log.starts.len()
        };
        self.start_count.send_replace(count);

        let result = self
            .results
            .recv()
            .await
            .unwrap_or(Err(ErrorCode::InternalError));
        self.log.lock().unwrap().on_air = result.is_ok();
        result
    }

    async fn stop_advertising(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.stops += 1;
        log.on_air = false;
    }

    fn is_advertising(&self) -> bool {
        self.log.lock().unwrap().on_air
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

impl GateControl {
    /// Wait until the radio has received `count` start calls
    pub async fn wait_for_starts(&mut self, count: usize) {
        self.start_count
            .wait_for(|started| *started >= count)
            .await
            .expect("gated advertiser dropped");
    }

    /// Release the oldest pending start with `result`
    pub fn complete(&self, result: Result<(), ErrorCode>) {
        self.results.send(result).expect("gated advertiser dropped");
    }

    pub fn starts(&self) -> usize {
        self.log.lock().unwrap().starts.len()
    }

    pub fn stops(&self) -> usize {
        self.log.lock().unwrap().stops
    }

    pub fn is_advertising(&self) -> bool {
        self.log.lock().unwrap().on_air
    }

    /// Fault reporter handed to the `index`th start
    pub fn reporter(&self, index: usize) -> FaultReporter {
        self.log.lock().unwrap().reporters[index].clone()
    }
}

// ----------------------------------------------------------------------------
// Event Helpers
// ----------------------------------------------------------------------------

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Next event, failing the test if none arrives
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Every event already delivered
pub fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

pub fn kinds(events: &[SessionEvent]) -> Vec<EventKind> {
    events.iter().map(|event| event.kind).collect()
}

pub fn changed(state: SessionState) -> EventKind {
    EventKind::StateChanged(state)
}
