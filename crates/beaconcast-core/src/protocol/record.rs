//! Operator-supplied records

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use super::packet_type::ByteOrder;
use super::struct_type::{StructType, StructValue};
use crate::errors::ValueError;

/// Errors parsing the `id=value` operator form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRecordError {
    #[error("expected ID=VALUE, got '{input}'")]
    MissingEquals { input: String },
    #[error("unknown struct type '{id}'")]
    UnknownType { id: String },
}

/// A single typed record as the operator entered it
///
/// The raw text is kept verbatim; it is validated and encoded only when a payload is
/// built, so the encoder can report the failing record's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructRecord {
    struct_type: StructType,
    raw_value: String,
}

impl StructRecord {
    pub fn new(struct_type: StructType, raw_value: impl Into<String>) -> Self {
        Self {
            struct_type,
            raw_value: raw_value.into(),
        }
    }

    pub fn struct_type(&self) -> StructType {
        self.struct_type
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn validate(&self) -> Result<(), ValueError> {
        self.struct_type.validate(&self.raw_value)
    }

    /// Encoded value bytes under the given byte order
    pub fn encode_value(&self, order: ByteOrder) -> Result<StructValue, ValueError> {
        self.struct_type.encode_value(&self.raw_value, order)
    }
}

impl fmt::Display for StructRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.struct_type.id(), self.raw_value)
    }
}

impl FromStr for StructRecord {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, value) = s.split_once('=').ok_or_else(|| ParseRecordError::MissingEquals {
            input: s.to_string(),
        })?;
        let struct_type = StructType::from_id(id).ok_or_else(|| ParseRecordError::UnknownType {
            id: id.trim().to_string(),
        })?;
        Ok(Self::new(struct_type, value))
    }
}
