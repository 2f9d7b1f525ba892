//! Session states and the lifecycle events published to observers

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::errors::ErrorCode;
use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// States of an advertising session
///
/// `Failed` and `TimedOut` are transient: the session passes through them on its way
/// back to `Idle` within a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing is being advertised
    Idle,
    /// The radio has been asked to advertise and has not answered yet
    Starting,
    /// The radio confirmed the advertisement is on air
    Running,
    /// The radio has been asked to stop and has not acknowledged yet
    Stopping,
    /// An active advertisement was lost
    Failed,
    /// The advertisement reached its deadline
    TimedOut,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
            SessionState::Failed => "failed",
            SessionState::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Session Events
// ----------------------------------------------------------------------------

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// The radio rejected or lost the advertisement
    Failed,
    /// The advertisement was stopped because its deadline elapsed
    TimedOut,
    /// The session moved to a new state
    StateChanged(SessionState),
}

/// Event published by an advertising session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub code: Option<ErrorCode>,
    pub timestamp: Timestamp,
}

impl SessionEvent {
    /// Radio failure carrying the platform code
    pub fn failed(code: ErrorCode) -> Self {
        Self {
            kind: EventKind::Failed,
            code: Some(code),
            timestamp: Timestamp::now(),
        }
    }

    /// Deadline reached
    pub fn timed_out() -> Self {
        Self {
            kind: EventKind::TimedOut,
            code: Some(ErrorCode::TimedOut),
            timestamp: Timestamp::now(),
        }
    }

    /// State transition
    pub fn state_changed(state: SessionState) -> Self {
        Self {
            kind: EventKind::StateChanged(state),
            code: None,
            timestamp: Timestamp::now(),
        }
    }

    /// Message to show an operator, for failures and timeouts only
    pub fn user_message(&self) -> Option<String> {
        match self.kind {
            EventKind::Failed => Some(
                self.code
                    .unwrap_or(ErrorCode::Unknown(-1))
                    .user_message(),
            ),
            EventKind::TimedOut => Some(ErrorCode::TimedOut.user_message()),
            EventKind::StateChanged(_) => None,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.code) {
            (EventKind::StateChanged(state), _) => write!(f, "state changed to {}", state),
            (EventKind::TimedOut, _) => write!(f, "timed out"),
            (EventKind::Failed, Some(code)) => {
                write!(f, "failed: {} ({})", code.name(), code.as_i32())
            }
            (EventKind::Failed, None) => write!(f, "failed"),
        }
    }
}
