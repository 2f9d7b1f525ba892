//! Advertising session and radio configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use beaconcast_core::ErrorCode;
use serde::{Deserialize, Serialize};

/// Default advertising timeout
pub const DEFAULT_ADVERTISE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

// ----------------------------------------------------------------------------
// Advertise Settings
// ----------------------------------------------------------------------------

/// Advertising interval trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    #[default]
    LowLatency,
}

impl AdvertiseMode {
    pub const ALL: [AdvertiseMode; 3] = [
        AdvertiseMode::LowPower,
        AdvertiseMode::Balanced,
        AdvertiseMode::LowLatency,
    ];

    pub fn id(self) -> &'static str {
        match self {
            AdvertiseMode::LowPower => "low-power",
            AdvertiseMode::Balanced => "balanced",
            AdvertiseMode::LowLatency => "low-latency",
        }
    }
}

/// Transmit power level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    #[default]
    High,
}

impl TxPowerLevel {
    pub const ALL: [TxPowerLevel; 4] = [
        TxPowerLevel::UltraLow,
        TxPowerLevel::Low,
        TxPowerLevel::Medium,
        TxPowerLevel::High,
    ];

    pub fn id(self) -> &'static str {
        match self {
            TxPowerLevel::UltraLow => "ultra-low",
            TxPowerLevel::Low => "low",
            TxPowerLevel::Medium => "medium",
            TxPowerLevel::High => "high",
        }
    }
}

macro_rules! impl_id_conversions {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().replace('_', "-");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.id().eq_ignore_ascii_case(&wanted))
                    .ok_or_else(|| format!("unknown {}: {}", $what, s))
            }
        }
    };
}

impl_id_conversions!(AdvertiseMode, "advertise mode");
impl_id_conversions!(TxPowerLevel, "tx power level");

/// Settings handed to the radio with every start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
}

impl AdvertiseSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: AdvertiseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tx_power(mut self, tx_power: TxPowerLevel) -> Self {
        self.tx_power = tx_power;
        self
    }

    pub fn with_connectable(mut self, connectable: bool) -> Self {
        self.connectable = connectable;
        self
    }
}

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Configuration for an advertising session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stop automatically after this long in `Running`; `None` advertises until stopped
    pub timeout: Option<Duration>,
    /// Radio settings used for every start
    pub settings: AdvertiseSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_ADVERTISE_TIMEOUT),
            settings: AdvertiseSettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the advertising timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Advertise until explicitly stopped
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_settings(mut self, settings: AdvertiseSettings) -> Self {
        self.settings = settings;
        self
    }
}

// ----------------------------------------------------------------------------
// Simulated Radio Configuration
// ----------------------------------------------------------------------------

/// Behaviour of the in-memory radio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedRadioConfig {
    /// Concurrent advertisement sets the radio can hold
    pub slots: usize,
    /// Slots already held by other applications
    #[serde(default)]
    pub occupied_slots: usize,
    /// Delay before each start completes
    pub latency: Duration,
    /// Reject every start with this code
    pub fail_with: Option<ErrorCode>,
}

impl Default for SimulatedRadioConfig {
    fn default() -> Self {
        Self {
            slots: 1,
            occupied_slots: 0,
            latency: Duration::from_millis(20),
            fail_with: None,
        }
    }
}

impl SimulatedRadioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_occupied_slots(mut self, occupied: usize) -> Self {
        self.occupied_slots = occupied;
        self
    }

    /// Slots left for this radio's advertisement
    pub fn free_slots(&self) -> usize {
        self.slots.saturating_sub(self.occupied_slots)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_fail_with(mut self, code: ErrorCode) -> Self {
        self.fail_with = Some(code);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.settings.mode, AdvertiseMode::LowLatency);
        assert_eq!(config.settings.tx_power, TxPowerLevel::High);
        assert!(!config.settings.connectable);
        assert_eq!(SessionConfig::new().without_timeout().timeout, None);
    }

    #[test]
    fn test_parse_setting_ids() {
        assert_eq!("low_power".parse::<AdvertiseMode>(), Ok(AdvertiseMode::LowPower));
        assert_eq!("Balanced".parse::<AdvertiseMode>(), Ok(AdvertiseMode::Balanced));
        assert_eq!("ultra-low".parse::<TxPowerLevel>(), Ok(TxPowerLevel::UltraLow));
        assert!("max".parse::<TxPowerLevel>().is_err());
        assert_eq!(TxPowerLevel::Medium.to_string(), "medium");
    }
}
