//! Fallback radio for hosts without peripheral-mode support

use beaconcast_core::{AdvertisementPayload, ErrorCode};
use tracing::warn;

use crate::config::AdvertiseSettings;

use super::{Advertiser, FaultReporter};

// ----------------------------------------------------------------------------
// Fallback Implementation
// ----------------------------------------------------------------------------

/// Radio that rejects every start with `FeatureUnsupported`
#[derive(Debug, Default)]
pub struct FallbackAdvertiser;

impl FallbackAdvertiser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Advertiser for FallbackAdvertiser {
    async fn start_advertising(
        &mut self,
        payload: &AdvertisementPayload,
        _settings: &AdvertiseSettings,
        _faults: FaultReporter,
    ) -> Result<(), ErrorCode> {
        warn!(
            "BLE advertising not supported on this platform. {} payload ({} bytes) will not be broadcast.",
            payload.packet_type(),
            payload.len()
        );
        Err(ErrorCode::FeatureUnsupported)
    }

    async fn stop_advertising(&mut self) {}

    fn is_advertising(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaconcast_core::{encode, PacketType};

    #[tokio::test]
    async fn test_fallback_rejects_start() {
        let payload = encode(PacketType::Plain, &[]).unwrap();
        let mut advertiser = FallbackAdvertiser::new();
        let result = advertiser
            .start_advertising(&payload, &AdvertiseSettings::default(), FaultReporter::disconnected())
            .await;
        assert_eq!(result, Err(ErrorCode::FeatureUnsupported));
        assert!(!advertiser.is_advertising());
    }
}
