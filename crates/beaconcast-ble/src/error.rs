//! Error types for the advertising session

use beaconcast_core::{EncodingError, ErrorCode};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors returned synchronously by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("advertising already started")]
    AlreadyStarted,

    #[error("a stop is still in progress")]
    StopInProgress,

    #[error("radio task is no longer running")]
    RadioUnavailable,

    #[error("advertising session requires a Tokio runtime")]
    NoRuntime,
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::AlreadyStarted => ErrorCode::AlreadyStarted,
            SessionError::StopInProgress | SessionError::RadioUnavailable => {
                ErrorCode::InternalError
            }
            SessionError::NoRuntime => ErrorCode::FeatureUnsupported,
        }
    }
}

/// Errors returned by `AdvertisingSession::start`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl StartError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StartError::Encoding(err) => err.code(),
            StartError::Session(err) => err.code(),
        }
    }

    /// Message to show an operator
    pub fn user_message(&self) -> String {
        self.code().user_message()
    }
}
