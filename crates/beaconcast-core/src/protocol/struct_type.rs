//! Struct types: the kinds of typed data an advertisement can carry
//!
//! Each [`StructType`] variant owns a row in a static table holding its identifier,
//! display name, one-byte tag, an example input, and the function that validates and
//! encodes the operator's text. All per-type behaviour is dispatched through that table.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use super::packet_type::ByteOrder;
use super::{
    AD_TYPE_128BIT_SERVICE_UUID_COMPLETE, AD_TYPE_16BIT_SERVICE_UUID_COMPLETE, AD_TYPE_APPEARANCE,
    AD_TYPE_COMPLETE_LOCAL_NAME, AD_TYPE_MANUFACTURER_SPECIFIC, AD_TYPE_TX_POWER_LEVEL,
    AD_TYPE_URI, MAX_ADVERTISEMENT_LEN, URI_SCHEME_HTTP, URI_SCHEME_HTTPS,
};
use crate::errors::ValueError;

/// Encoded value bytes of a single record
pub type StructValue = SmallVec<[u8; MAX_ADVERTISEMENT_LEN]>;

type EncodeFn = fn(&str, ByteOrder) -> Result<StructValue, ValueError>;

// ----------------------------------------------------------------------------
// Struct Type
// ----------------------------------------------------------------------------

/// Kind of data carried by a record
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructType {
    /// 16-bit service UUID, four hex digits
    Uuid16 = 0,
    /// 128-bit UUID in any textual form
    Uuid128 = 1,
    /// iBeacon major and minor, `major:minor`
    MajorMinor = 2,
    /// Calibrated TX power in dBm
    TxPower = 3,
    /// UTF-8 text, advertised as the complete local name
    Text = 4,
    /// http or https URL, advertised with a compressed scheme
    Url = 5,
    /// GAP appearance value
    Appearance = 6,
    /// Arbitrary bytes given as hex
    #[serde(rename = "raw")]
    RawBytes = 7,
}

struct StructTypeEntry {
    id: &'static str,
    display_name: &'static str,
    tag: u8,
    example: &'static str,
    encode: EncodeFn,
}

static STRUCT_TYPES: [StructTypeEntry; 8] = [
    StructTypeEntry {
        id: "uuid16",
        display_name: "16-bit UUID",
        tag: AD_TYPE_16BIT_SERVICE_UUID_COMPLETE,
        example: "180D",
        encode: encode_uuid16,
    },
    StructTypeEntry {
        id: "uuid128",
        display_name: "128-bit UUID",
        tag: AD_TYPE_128BIT_SERVICE_UUID_COMPLETE,
        example: "e2c56db5-dffb-48d2-b060-d0f5a71096e0",
        encode: encode_uuid128,
    },
    StructTypeEntry {
        id: "major-minor",
        display_name: "Major/Minor",
        tag: AD_TYPE_MANUFACTURER_SPECIFIC,
        example: "1:42",
        encode: encode_major_minor,
    },
    StructTypeEntry {
        id: "tx-power",
        display_name: "TX Power",
        tag: AD_TYPE_TX_POWER_LEVEL,
        example: "-59",
        encode: encode_tx_power,
    },
    StructTypeEntry {
        id: "text",
        display_name: "Text",
        tag: AD_TYPE_COMPLETE_LOCAL_NAME,
        example: "hello",
        encode: encode_text,
    },
    StructTypeEntry {
        id: "url",
        display_name: "URL",
        tag: AD_TYPE_URI,
        example: "https://gshs.hs.kr",
        encode: encode_url,
    },
    StructTypeEntry {
        id: "appearance",
        display_name: "Appearance",
        tag: AD_TYPE_APPEARANCE,
        example: "0x0200",
        encode: encode_appearance,
    },
    StructTypeEntry {
        id: "raw",
        display_name: "Raw Bytes",
        tag: AD_TYPE_MANUFACTURER_SPECIFIC,
        example: "ffff0102",
        encode: encode_raw_bytes,
    },
];

impl StructType {
    /// Every struct type, in ordinal order
    pub const ALL: [StructType; 8] = [
        StructType::Uuid16,
        StructType::Uuid128,
        StructType::MajorMinor,
        StructType::TxPower,
        StructType::Text,
        StructType::Url,
        StructType::Appearance,
        StructType::RawBytes,
    ];

    fn entry(self) -> &'static StructTypeEntry {
        &STRUCT_TYPES[self as usize]
    }

    /// Position of this type in [`StructType::ALL`]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Short identifier used on the command line and in config files
    pub fn id(self) -> &'static str {
        self.entry().id
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        self.entry().display_name
    }

    /// One-byte type tag written in front of the value by tagged framings
    pub fn tag(self) -> u8 {
        self.entry().tag
    }

    /// A valid sample input
    pub fn example(self) -> &'static str {
        self.entry().example
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.id().eq_ignore_ascii_case(id))
    }

    /// Check `raw` against this type's validation rule
    pub fn validate(self, raw: &str) -> Result<(), ValueError> {
        self.encode_value(raw, ByteOrder::LittleEndian).map(|_| ())
    }

    /// Validate `raw` and produce the value bytes
    ///
    /// `order` only affects UUID types; numeric fields have a fixed byte order.
    pub fn encode_value(self, raw: &str, order: ByteOrder) -> Result<StructValue, ValueError> {
        (self.entry().encode)(raw, order)
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for StructType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| format!("unknown struct type: {}", s))
    }
}

// ----------------------------------------------------------------------------
// Encoding Rules
// ----------------------------------------------------------------------------

fn strip_hex_prefix(input: &str) -> Option<&str> {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
}

fn parse_integer(raw: &str, min: i64, max: i64) -> Result<i64, ValueError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }

    let invalid = || ValueError::InvalidNumber {
        input: trimmed.to_string(),
    };
    let value = match strip_hex_prefix(trimmed) {
        Some(digits) => {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            i64::from_str_radix(digits, 16).map_err(|_| invalid())?
        }
        None => trimmed.parse::<i64>().map_err(|_| invalid())?,
    };

    if value < min || value > max {
        return Err(ValueError::OutOfRange { value, min, max });
    }
    Ok(value)
}

fn encode_uuid16(raw: &str, order: ByteOrder) -> Result<StructValue, ValueError> {
    let trimmed = raw.trim();
    let digits = strip_hex_prefix(trimmed).unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ValueError::Empty);
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValueError::InvalidHex {
            input: trimmed.to_string(),
        });
    }
    if digits.len() != 4 {
        return Err(ValueError::WrongDigitCount {
            expected: 4,
            actual: digits.len(),
        });
    }

    let value = u16::from_str_radix(digits, 16).map_err(|_| ValueError::InvalidHex {
        input: trimmed.to_string(),
    })?;
    Ok(StructValue::from_slice(&order.u16_bytes(value)))
}

fn encode_uuid128(raw: &str, order: ByteOrder) -> Result<StructValue, ValueError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }

    let uuid = Uuid::parse_str(trimmed).map_err(|_| ValueError::InvalidUuid {
        input: trimmed.to_string(),
    })?;
    Ok(StructValue::from_slice(&order.u128_bytes(uuid.as_u128())))
}

fn encode_major_minor(raw: &str, _order: ByteOrder) -> Result<StructValue, ValueError> {
    if raw.trim().is_empty() {
        return Err(ValueError::Empty);
    }
    let (major, minor) = raw
        .split_once(':')
        .ok_or(ValueError::MissingSeparator { separator: ':' })?;

    let major = parse_integer(major, 0, u16::MAX as i64)? as u16;
    let minor = parse_integer(minor, 0, u16::MAX as i64)? as u16;

    let mut value = StructValue::new();
    value.extend_from_slice(&major.to_be_bytes());
    value.extend_from_slice(&minor.to_be_bytes());
    Ok(value)
}

fn encode_tx_power(raw: &str, _order: ByteOrder) -> Result<StructValue, ValueError> {
    let dbm = parse_integer(raw, -127, 127)? as i8;
    Ok(StructValue::from_slice(&dbm.to_le_bytes()))
}

fn encode_text(raw: &str, _order: ByteOrder) -> Result<StructValue, ValueError> {
    if raw.is_empty() {
        return Err(ValueError::Empty);
    }
    Ok(StructValue::from_slice(raw.as_bytes()))
}

fn encode_url(raw: &str, _order: ByteOrder) -> Result<StructValue, ValueError> {
    if raw.is_empty() {
        return Err(ValueError::Empty);
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(ValueError::ContainsWhitespace);
    }

    let has_prefix = |prefix: &str| {
        raw.get(..prefix.len())
            .map(|head| head.eq_ignore_ascii_case(prefix))
            .unwrap_or(false)
    };
    // The scheme code replaces "http:" / "https:"; the remainder keeps its leading "//".
    let (scheme, rest) = if has_prefix("https://") {
        (URI_SCHEME_HTTPS, &raw["https:".len()..])
    } else if has_prefix("http://") {
        (URI_SCHEME_HTTP, &raw["http:".len()..])
    } else {
        return Err(ValueError::UnsupportedScheme);
    };

    if rest.len() <= 2 {
        return Err(ValueError::MissingHost);
    }

    let mut value = StructValue::new();
    value.push(scheme);
    value.extend_from_slice(rest.as_bytes());
    Ok(value)
}

fn encode_appearance(raw: &str, _order: ByteOrder) -> Result<StructValue, ValueError> {
    let appearance = parse_integer(raw, 0, u16::MAX as i64)? as u16;
    Ok(StructValue::from_slice(&appearance.to_le_bytes()))
}

fn encode_raw_bytes(raw: &str, _order: ByteOrder) -> Result<StructValue, ValueError> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '-'))
        .collect();
    let digits = strip_hex_prefix(&digits).unwrap_or(&digits);
    if digits.is_empty() {
        return Err(ValueError::Empty);
    }

    let bytes = hex::decode(digits).map_err(|_| ValueError::InvalidHex {
        input: raw.trim().to_string(),
    })?;
    Ok(StructValue::from_vec(bytes))
}
