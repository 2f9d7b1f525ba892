//! beaconcast CLI configuration
//!
//! Configuration is read from a TOML file passed with `--config`. Every section is
//! optional and falls back to its defaults; command line flags override file values.
//!
//! ```toml
//! [advertising]
//! packet_type = "ibeacon"
//! timeout_secs = 600
//! mode = "low-latency"
//! tx_power = "high"
//! connectable = false
//!
//! [radio]
//! slots = 2
//! occupied_slots = 1
//! latency_ms = 20
//!
//! [[records]]
//! struct_type = "uuid128"
//! raw_value = "e2c56db5-dffb-48d2-b060-d0f5a71096e0"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use beaconcast_ble::{
    AdvertiseMode, AdvertiseSettings, SessionConfig, SimulatedRadioConfig, TxPowerLevel,
    DEFAULT_ADVERTISE_TIMEOUT,
};
use beaconcast_core::{PacketType, StructRecord};

use crate::error::{CliError, Result};

/// Longest accepted advertising timeout, in seconds (one week)
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted start latency for the simulated radio, in milliseconds
pub const MAX_LATENCY_MS: u64 = 60_000;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the beaconcast CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session and radio settings
    pub advertising: AdvertisingConfig,

    /// Simulated radio behaviour
    pub radio: RadioConfig,

    /// Records advertised when none are given on the command line
    pub records: Vec<StructRecord>,
}

/// `[advertising]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvertisingConfig {
    pub packet_type: PacketType,

    /// Seconds before a running advertisement stops on its own; 0 disables the timeout.
    /// At most [`MAX_TIMEOUT_SECS`].
    pub timeout_secs: u64,

    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
}

/// `[radio]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Advertisement slots available on the simulated controller
    pub slots: usize,

    /// Slots already taken by other applications
    pub occupied_slots: usize,

    /// Start completion latency in milliseconds
    pub latency_ms: u64,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for AdvertisingConfig {
    fn default() -> Self {
        let settings = AdvertiseSettings::default();
        Self {
            packet_type: PacketType::default(),
            timeout_secs: DEFAULT_ADVERTISE_TIMEOUT.as_secs(),
            mode: settings.mode,
            tx_power: settings.tx_power,
            connectable: settings.connectable,
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        let radio = SimulatedRadioConfig::default();
        Self {
            slots: radio.slots,
            occupied_slots: radio.occupied_slots,
            latency_ms: radio.latency.as_millis() as u64,
        }
    }
}

// ----------------------------------------------------------------------------
// Loading and Conversion
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configured records and radio settings
    pub fn validate(&self) -> Result<()> {
        for (index, record) in self.records.iter().enumerate() {
            record.validate().map_err(|reason| {
                CliError::Config(format!("record {} ({}): {}", index, record, reason))
            })?;
        }

        if self.advertising.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(CliError::Config(format!(
                "advertising timeout must not exceed {} s",
                MAX_TIMEOUT_SECS
            )));
        }

        if self.radio.latency_ms > MAX_LATENCY_MS {
            return Err(CliError::Config(format!(
                "radio latency must not exceed {} ms",
                MAX_LATENCY_MS
            )));
        }

        Ok(())
    }

    /// Session configuration described by the `[advertising]` section
    pub fn session_config(&self) -> SessionConfig {
        let settings = AdvertiseSettings::new()
            .with_mode(self.advertising.mode)
            .with_tx_power(self.advertising.tx_power)
            .with_connectable(self.advertising.connectable);

        let config = SessionConfig::new().with_settings(settings);
        match self.advertising.timeout_secs {
            0 => config.without_timeout(),
            secs => config.with_timeout(Duration::from_secs(secs)),
        }
    }

    /// Simulated radio configuration described by the `[radio]` section
    pub fn radio_config(&self) -> SimulatedRadioConfig {
        SimulatedRadioConfig::new()
            .with_slots(self.radio.slots)
            .with_occupied_slots(self.radio.occupied_slots)
            .with_latency(Duration::from_millis(self.radio.latency_ms))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use beaconcast_core::StructType;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.advertising.packet_type, PacketType::Plain);
        assert_eq!(config.advertising.timeout_secs, 600);
        assert_eq!(config.radio.slots, 1);
        assert!(config.records.is_empty());
        assert!(config.validate().is_ok());
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config = AppConfig::from_toml_str("[radio]\nslots = 2\n").unwrap();
        assert_eq!(config.radio.slots, 2);
        assert_eq!(config.radio.latency_ms, 20);
        assert_eq!(config.advertising, AdvertisingConfig::default());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [advertising]
            packet_type = "ibeacon"
            timeout_secs = 0
            mode = "balanced"
            tx_power = "ultra-low"
            connectable = true

            [[records]]
            struct_type = "major-minor"
            raw_value = "1:42"
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.advertising.packet_type, PacketType::IBeacon);
        assert_eq!(
            config.records,
            vec![StructRecord::new(StructType::MajorMinor, "1:42")]
        );

        let session = config.session_config();
        assert_eq!(session.timeout, None);
        assert_eq!(session.settings.mode, AdvertiseMode::Balanced);
        assert_eq!(session.settings.tx_power, TxPowerLevel::UltraLow);
        assert!(session.settings.connectable);
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        let toml = r#"
            [[records]]
            struct_type = "tx-power"
            raw_value = "-300"
        "#;
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("record 0"));

        let err = AppConfig::from_toml_str("[advertising]\npacket_type = \"eddystone\"\n");
        assert!(matches!(err, Err(CliError::TomlParsing(_))));
    }

    #[test]
    fn test_out_of_range_timeout_is_rejected() {
        let toml = format!("[advertising]\ntimeout_secs = {}\n", u64::MAX);
        let err = AppConfig::from_toml_str(&toml);
        assert!(matches!(err, Err(CliError::TomlParsing(_)) | Err(CliError::Config(_))));

        let toml = format!("[advertising]\ntimeout_secs = {}\n", MAX_TIMEOUT_SECS + 1);
        let err = AppConfig::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("advertising timeout"));

        let toml = format!("[advertising]\ntimeout_secs = {}\n", MAX_TIMEOUT_SECS);
        let config = AppConfig::from_toml_str(&toml).unwrap();
        assert_eq!(
            config.session_config().timeout,
            Some(Duration::from_secs(MAX_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_occupied_slots_reach_radio() {
        let config = AppConfig::from_toml_str("[radio]\nslots = 2\noccupied_slots = 1\n").unwrap();
        let radio = config.radio_config();
        assert_eq!(radio.slots, 2);
        assert_eq!(radio.free_slots(), 1);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.records.push(StructRecord::new(StructType::Text, "hi"));
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[advertising]"));
        assert_eq!(AppConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
