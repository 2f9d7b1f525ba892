//! Radio advertising trait and the bundled radio implementations

pub mod fallback;
pub mod simulated;

use std::fmt;
use std::sync::Arc;

use beaconcast_core::{AdvertisementPayload, ErrorCode};

use crate::config::AdvertiseSettings;

// ----------------------------------------------------------------------------
// Radio Advertising Trait
// ----------------------------------------------------------------------------

/// Platform advertise primitives
///
/// Calls are issued one at a time from the session's radio task, in the order the
/// session requested them. Implementations never touch session state directly: a start
/// result is returned, and an advertisement lost later is reported through the
/// [`FaultReporter`] handed to `start_advertising`.
#[async_trait::async_trait]
pub trait Advertiser: Send {
    /// Begin advertising `payload`
    async fn start_advertising(
        &mut self,
        payload: &AdvertisementPayload,
        settings: &AdvertiseSettings,
        faults: FaultReporter,
    ) -> Result<(), ErrorCode>;

    /// Stop advertising; a no-op when nothing is on air
    async fn stop_advertising(&mut self);

    /// Whether an advertisement is currently on air
    fn is_advertising(&self) -> bool;

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "radio"
    }
}

#[async_trait::async_trait]
impl Advertiser for Box<dyn Advertiser> {
    async fn start_advertising(
        &mut self,
        payload: &AdvertisementPayload,
        settings: &AdvertiseSettings,
        faults: FaultReporter,
    ) -> Result<(), ErrorCode> {
        (**self).start_advertising(payload, settings, faults).await
    }

    async fn stop_advertising(&mut self) {
        (**self).stop_advertising().await
    }

    fn is_advertising(&self) -> bool {
        (**self).is_advertising()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ----------------------------------------------------------------------------
// Fault Reporting
// ----------------------------------------------------------------------------

/// Channel back to the session for advertisements lost after a successful start
///
/// Each reporter is tied to the start that produced it; reports arriving after the
/// session has moved on are discarded by the session.
#[derive(Clone)]
pub struct FaultReporter {
    sink: Arc<dyn Fn(ErrorCode) + Send + Sync>,
}

impl FaultReporter {
    pub fn new(sink: impl Fn(ErrorCode) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Reporter that drops every fault
    pub fn disconnected() -> Self {
        Self::new(|_| {})
    }

    /// Report that the advertisement was lost with `code`
    pub fn report(&self, code: ErrorCode) {
        (self.sink)(code)
    }
}

impl fmt::Debug for FaultReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultReporter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_fault_reporter_forwards_codes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = FaultReporter::new(move |code| sink.lock().unwrap().push(code));

        reporter.clone().report(ErrorCode::InternalError);
        reporter.report(ErrorCode::Unknown(9));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ErrorCode::InternalError, ErrorCode::Unknown(9)]
        );
        FaultReporter::disconnected().report(ErrorCode::InternalError);
    }
}
