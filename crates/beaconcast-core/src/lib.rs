//! beaconcast Core
//!
//! This crate provides the foundational types for advertising typed records over
//! Bluetooth Low Energy: the struct and packet framing types, the payload encoder that
//! packs records into the 31-byte legacy advertisement envelope, and the event and error
//! code types shared with the session layer in `beaconcast-ble`.
//!
//! Everything in this crate is synchronous and free of side effects, so it can be used
//! from any context without locking.
//!
//! ```rust
//! use beaconcast_core::{encode, PacketType, StructRecord, StructType};
//!
//! let records = vec![StructRecord::new(StructType::Text, "hi")];
//! let payload = encode(PacketType::Plain, &records).unwrap();
//! assert_eq!(payload.as_bytes(), &[0x02, 0x01, 0x06, 0x03, 0x09, b'h', b'i']);
//! ```

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod errors;
pub mod event;
pub mod protocol;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use errors::{EncodingError, ErrorCode, ValueError};
pub use event::{EventKind, SessionEvent, SessionState};
pub use protocol::encoder::{encode, AdvertisementPayload, PayloadEncoder};
pub use protocol::packet_type::{ByteOrder, PacketType, RecordFraming};
pub use protocol::record::{ParseRecordError, StructRecord};
pub use protocol::struct_type::{StructType, StructValue};
pub use protocol::MAX_ADVERTISEMENT_LEN;
pub use types::Timestamp;

/// Result type for encoding operations
pub type Result<T> = core::result::Result<T, EncodingError>;
