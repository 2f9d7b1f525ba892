//! Error types for beaconcast
//!
//! This module contains the validation errors raised while encoding records, the
//! encoder's own error type, and the `ErrorCode` set surfaced to session observers.

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Value Validation Errors
// ----------------------------------------------------------------------------

/// Reasons a record's raw text fails its struct type's validation rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("value is empty")]
    Empty,
    #[error("not a valid hex string: {input}")]
    InvalidHex { input: String },
    #[error("expected {expected} hex digits, got {actual}")]
    WrongDigitCount { expected: usize, actual: usize },
    #[error("malformed UUID: {input}")]
    InvalidUuid { input: String },
    #[error("not a number: {input}")]
    InvalidNumber { input: String },
    #[error("{value} is out of range ({min}..={max})")]
    OutOfRange { value: i64, min: i64, max: i64 },
    #[error("expected two values separated by '{separator}'")]
    MissingSeparator { separator: char },
    #[error("URL must start with http:// or https://")]
    UnsupportedScheme,
    #[error("URL has no host after the scheme")]
    MissingHost,
    #[error("URL must not contain whitespace")]
    ContainsWhitespace,
}

// ----------------------------------------------------------------------------
// Encoding Errors
// ----------------------------------------------------------------------------

/// Errors produced by the payload encoder
///
/// Both variants are detected locally, before any radio operation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("payload too large: record {index} brings the advertisement to {size} bytes (max {max})")]
    PayloadTooLarge { index: usize, size: usize, max: usize },
    #[error("invalid value for record {index}: {reason}")]
    InvalidRecordValue { index: usize, reason: ValueError },
}

impl EncodingError {
    /// Index of the record that caused the failure
    pub fn index(&self) -> usize {
        match self {
            EncodingError::PayloadTooLarge { index, .. } => *index,
            EncodingError::InvalidRecordValue { index, .. } => *index,
        }
    }

    /// Observer-facing code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            EncodingError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            EncodingError::InvalidRecordValue { .. } => ErrorCode::InvalidRecordValue,
        }
    }
}

// ----------------------------------------------------------------------------
// Error Codes
// ----------------------------------------------------------------------------

/// Codes surfaced to observers of an advertising session
///
/// The radio rejection codes share their numeric values with the platform advertise
/// callback (1..=5); `TimedOut` and the encoder codes are local to beaconcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum ErrorCode {
    #[error("data packet exceeded 31 byte limit")]
    DataTooLarge,
    #[error("too many advertisers")]
    TooManyAdvertisers,
    #[error("already started")]
    AlreadyStarted,
    #[error("internal error")]
    InternalError,
    #[error("not supported on this device")]
    FeatureUnsupported,
    #[error("timed out")]
    TimedOut,
    #[error("invalid struct value")]
    InvalidRecordValue,
    #[error("struct data exceeded 31 byte limit")]
    PayloadTooLarge,
    #[error("unknown error ({0})")]
    Unknown(i32),
}

impl ErrorCode {
    /// Every named code, in numeric order
    pub const KNOWN: [ErrorCode; 8] = [
        ErrorCode::DataTooLarge,
        ErrorCode::TooManyAdvertisers,
        ErrorCode::AlreadyStarted,
        ErrorCode::InternalError,
        ErrorCode::FeatureUnsupported,
        ErrorCode::TimedOut,
        ErrorCode::InvalidRecordValue,
        ErrorCode::PayloadTooLarge,
    ];

    /// Numeric value of this code
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::DataTooLarge => 1,
            ErrorCode::TooManyAdvertisers => 2,
            ErrorCode::AlreadyStarted => 3,
            ErrorCode::InternalError => 4,
            ErrorCode::FeatureUnsupported => 5,
            ErrorCode::TimedOut => 6,
            ErrorCode::InvalidRecordValue => 100,
            ErrorCode::PayloadTooLarge => 101,
            ErrorCode::Unknown(value) => value,
        }
    }

    /// Map a numeric value back to a code
    pub fn from_i32(value: i32) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|code| code.as_i32() == value)
            .unwrap_or(ErrorCode::Unknown(value))
    }

    /// Upper-case constant name, e.g. `ALREADY_STARTED`
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::DataTooLarge => "DATA_TOO_LARGE",
            ErrorCode::TooManyAdvertisers => "TOO_MANY_ADVERTISERS",
            ErrorCode::AlreadyStarted => "ALREADY_STARTED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FeatureUnsupported => "FEATURE_UNSUPPORTED",
            ErrorCode::TimedOut => "TIMED_OUT",
            ErrorCode::InvalidRecordValue => "INVALID_RECORD_VALUE",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::Unknown(_) => "UNKNOWN",
        }
    }

    /// Parse either a constant name (`TOO_MANY_ADVERTISERS`, case-insensitive) or a number
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if let Ok(value) = trimmed.parse::<i32>() {
            return Some(Self::from_i32(value));
        }
        let normalized = trimmed.to_ascii_uppercase().replace('-', "_");
        Self::KNOWN.iter().copied().find(|code| code.name() == normalized)
    }

    /// One-line message suitable for showing to an operator
    pub fn user_message(self) -> String {
        match self {
            ErrorCode::TimedOut => "Advertising stopped due to timeout.".to_string(),
            ErrorCode::Unknown(_) => "Start advertising failed: unknown error".to_string(),
            other => format!("Start advertising failed: {}.", other),
        }
    }
}
