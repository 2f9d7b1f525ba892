//! Bluetooth Low Energy advertising session for beaconcast
//!
//! This crate drives a radio through the lifecycle of a single advertisement: encoding
//! is delegated to `beaconcast-core`, radio calls go through the [`Advertiser`] trait,
//! and lifecycle changes are published to observers as [`SessionEvent`]s.
//!
//! ## Architecture
//!
//! - [`config`] - Session, advertise and simulated radio settings
//! - [`error`] - Session and start errors
//! - [`advertising`] - Radio trait, fault reporting, simulated and fallback radios
//! - [`notifier`] - Observer registry and asynchronous event delivery
//! - [`session`] - The advertising state machine
//!
//! ## Usage
//!
//! ```rust,no_run
//! use beaconcast_ble::{AdvertisingSession, SessionConfig, SimulatedAdvertiser};
//! use beaconcast_core::{PacketType, SessionState, StructRecord, StructType};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new().with_timeout(Duration::from_secs(30));
//! let session = AdvertisingSession::with_config(SimulatedAdvertiser::new(), config)?;
//!
//! session.subscribe(|event: &beaconcast_core::SessionEvent| {
//!     if let Some(message) = event.user_message() {
//!         eprintln!("{}", message);
//!     }
//! });
//!
//! session.start(PacketType::Plain, &[StructRecord::new(StructType::Text, "hello")])?;
//! session.wait_for_state(SessionState::Running).await;
//! session.stop();
//! # Ok(())
//! # }
//! ```

pub mod advertising;
pub mod config;
pub mod error;
pub mod notifier;
pub mod session;

// Public API exports
pub use advertising::fallback::FallbackAdvertiser;
pub use advertising::simulated::{SimulatedAdvertiser, SimulatedRadio};
pub use advertising::{Advertiser, FaultReporter};
pub use config::{
    AdvertiseMode, AdvertiseSettings, SessionConfig, SimulatedRadioConfig, TxPowerLevel,
    DEFAULT_ADVERTISE_TIMEOUT,
};
pub use error::{SessionError, StartError};
pub use notifier::{EventNotifier, ObserverId, SessionObserver};
pub use session::AdvertisingSession;

// Re-export core event types for convenience
pub use beaconcast_core::{ErrorCode, EventKind, SessionEvent, SessionState};
