//! In-memory radio
//!
//! `SimulatedAdvertiser` behaves like a peripheral controller with a fixed number of
//! advertisement slots, some of which may already be held by other applications. It counts
//! every call, can be told to reject starts with a given code, and lets tests drop an
//! active advertisement through [`SimulatedRadio::inject_fault`].

use std::sync::{Arc, Mutex, MutexGuard};

use beaconcast_core::{AdvertisementPayload, ErrorCode, MAX_ADVERTISEMENT_LEN};
use tracing::{debug, info};

use crate::config::{AdvertiseSettings, SimulatedRadioConfig};

use super::{Advertiser, FaultReporter};

// ----------------------------------------------------------------------------
// Radio State
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RadioState {
    start_calls: usize,
    stop_calls: usize,
    on_air: Option<AdvertisementPayload>,
    faults: Option<FaultReporter>,
}

fn lock_state(state: &Mutex<RadioState>) -> MutexGuard<'_, RadioState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Inspection Handle
// ----------------------------------------------------------------------------

/// Shared view of a [`SimulatedAdvertiser`], usable after the advertiser is moved into
/// a session
#[derive(Debug, Clone)]
pub struct SimulatedRadio {
    state: Arc<Mutex<RadioState>>,
}

impl SimulatedRadio {
    pub fn start_calls(&self) -> usize {
        lock_state(&self.state).start_calls
    }

    pub fn stop_calls(&self) -> usize {
        lock_state(&self.state).stop_calls
    }

    pub fn is_advertising(&self) -> bool {
        lock_state(&self.state).on_air.is_some()
    }

    /// Payload currently on air
    pub fn on_air(&self) -> Option<AdvertisementPayload> {
        lock_state(&self.state).on_air.clone()
    }

    /// Drop the active advertisement and report `code` to the session
    ///
    /// Returns `false` when nothing was on air.
    pub fn inject_fault(&self, code: ErrorCode) -> bool {
        let reporter = {
            let mut state = lock_state(&self.state);
            if state.on_air.take().is_none() {
                return false;
            }
            state.faults.take()
        };

        info!("Simulated radio lost its advertisement: {}", code.name());
        if let Some(reporter) = reporter {
            reporter.report(code);
        }
        true
    }
}

// ----------------------------------------------------------------------------
// Simulated Advertiser
// ----------------------------------------------------------------------------

/// Radio implementation backed by memory
#[derive(Debug)]
pub struct SimulatedAdvertiser {
    config: SimulatedRadioConfig,
    state: Arc<Mutex<RadioState>>,
}

impl SimulatedAdvertiser {
    pub fn new() -> Self {
        Self::with_config(SimulatedRadioConfig::default())
    }

    pub fn with_config(config: SimulatedRadioConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RadioState::default())),
        }
    }

    /// Inspection handle sharing this radio's state
    pub fn radio(&self) -> SimulatedRadio {
        SimulatedRadio {
            state: self.state.clone(),
        }
    }

    fn check_start(&self, payload: &AdvertisementPayload) -> Result<(), ErrorCode> {
        if let Some(code) = self.config.fail_with {
            return Err(code);
        }
        if lock_state(&self.state).on_air.is_some() {
            return Err(ErrorCode::AlreadyStarted);
        }
        if self.config.free_slots() == 0 {
            return Err(ErrorCode::TooManyAdvertisers);
        }
        if payload.len() > MAX_ADVERTISEMENT_LEN {
            return Err(ErrorCode::DataTooLarge);
        }
        Ok(())
    }
}

impl Default for SimulatedAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Advertiser for SimulatedAdvertiser {
    async fn start_advertising(
        &mut self,
        payload: &AdvertisementPayload,
        settings: &AdvertiseSettings,
        faults: FaultReporter,
    ) -> Result<(), ErrorCode> {
        lock_state(&self.state).start_calls += 1;

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        self.check_start(payload)?;

        let mut state = lock_state(&self.state);
        state.on_air = Some(payload.clone());
        state.faults = Some(faults);
        debug!("Simulated radio advertising {} ({:?})", payload, settings.mode);
        Ok(())
    }

    async fn stop_advertising(&mut self) {
        let mut state = lock_state(&self.state);
        state.stop_calls += 1;
        state.on_air = None;
        state.faults = None;
    }

    fn is_advertising(&self) -> bool {
        lock_state(&self.state).on_air.is_some()
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
