//! Error handling for the beaconcast CLI

use beaconcast_ble::{SessionError, StartError};
use beaconcast_core::{EncodingError, ErrorCode};
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Start failed: {0}")]
    Start(#[from] StartError),

    #[error("Advertising failed: {} ({})", .0.name(), .0.as_i32())]
    Radio(ErrorCode),
}

impl CliError {
    /// Observer-facing code, when the error maps onto one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CliError::Encoding(err) => Some(err.code()),
            CliError::Session(err) => Some(err.code()),
            CliError::Start(err) => Some(err.code()),
            CliError::Radio(code) => Some(*code),
            _ => None,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
