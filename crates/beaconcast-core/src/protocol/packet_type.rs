//! Packet types: header framings that wrap the encoded records

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use super::{
    AD_TYPE_FLAGS, AD_TYPE_MANUFACTURER_SPECIFIC, APPLE_COMPANY_ID,
    FLAGS_GENERAL_DISCOVERABLE_LE_ONLY, IBEACON_TYPE, MAX_ADVERTISEMENT_LEN,
};

const PLAIN_HEADER: [u8; 3] = [0x02, AD_TYPE_FLAGS, FLAGS_GENERAL_DISCOVERABLE_LE_ONLY];

const IBEACON_HEADER: [u8; 9] = [
    0x02,
    AD_TYPE_FLAGS,
    FLAGS_GENERAL_DISCOVERABLE_LE_ONLY,
    0x1A,
    AD_TYPE_MANUFACTURER_SPECIFIC,
    APPLE_COMPANY_ID[0],
    APPLE_COMPANY_ID[1],
    IBEACON_TYPE,
    0x15,
];

const IBEACON_AD_LEN_OFFSET: usize = 3;
const IBEACON_DATA_LEN_OFFSET: usize = 8;

/// Byte order applied to multi-byte UUID values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn u128_bytes(self, value: u128) -> [u8; 16] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }
}

/// How a single record is laid out after the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordFraming {
    /// `[1 + value length][tag][value...]`
    AdStructure,
    /// Value bytes only, at a position fixed by record order
    Positional,
}

/// Framing scheme of an advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketType {
    /// Flags AD followed by one AD structure per record
    #[default]
    Plain,
    /// Flags AD followed by an Apple iBeacon manufacturer-specific AD
    IBeacon,
}

impl PacketType {
    pub const ALL: [PacketType; 2] = [PacketType::Plain, PacketType::IBeacon];

    /// Short identifier used on the command line and in config files
    pub fn id(self) -> &'static str {
        match self {
            PacketType::Plain => "plain",
            PacketType::IBeacon => "ibeacon",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PacketType::Plain => "Plain",
            PacketType::IBeacon => "iBeacon",
        }
    }

    /// Fixed bytes preceding the records, before length patching
    pub fn header(self) -> &'static [u8] {
        match self {
            PacketType::Plain => &PLAIN_HEADER,
            PacketType::IBeacon => &IBEACON_HEADER,
        }
    }

    pub fn framing(self) -> RecordFraming {
        match self {
            PacketType::Plain => RecordFraming::AdStructure,
            PacketType::IBeacon => RecordFraming::Positional,
        }
    }

    pub fn byte_order(self) -> ByteOrder {
        match self {
            PacketType::Plain => ByteOrder::LittleEndian,
            PacketType::IBeacon => ByteOrder::BigEndian,
        }
    }

    /// Bytes left for records once the header is written
    pub fn budget(self) -> usize {
        MAX_ADVERTISEMENT_LEN - self.header().len()
    }

    /// Number of bytes a record with `value_len` value bytes occupies under this framing
    pub fn framed_len(self, value_len: usize) -> usize {
        match self.framing() {
            RecordFraming::AdStructure => 2 + value_len,
            RecordFraming::Positional => value_len,
        }
    }

    /// Append one framed record to `out`
    pub(crate) fn write_record(self, tag: u8, value: &[u8], out: &mut impl Extend<u8>) {
        if self.framing() == RecordFraming::AdStructure {
            // Callers guarantee the record fits in 31 bytes, so the length fits in a u8.
            out.extend([(1 + value.len()) as u8, tag]);
        }
        out.extend(value.iter().copied());
    }

    /// Patch header length fields once every record has been written
    pub(crate) fn finalize(self, bytes: &mut [u8]) {
        if self == PacketType::IBeacon && bytes.len() >= IBEACON_HEADER.len() {
            let total = bytes.len();
            bytes[IBEACON_AD_LEN_OFFSET] = (total - (IBEACON_AD_LEN_OFFSET + 1)) as u8;
            bytes[IBEACON_DATA_LEN_OFFSET] = (total - (IBEACON_DATA_LEN_OFFSET + 1)) as u8;
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PacketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.id().eq_ignore_ascii_case(id))
            .ok_or_else(|| format!("unknown packet type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budgets() {
        assert_eq!(PacketType::Plain.budget(), 28);
        assert_eq!(PacketType::IBeacon.budget(), 22);
    }

    #[test]
    fn test_write_record_framing() {
        let mut plain = Vec::new();
        PacketType::Plain.write_record(0x09, b"hi", &mut plain);
        assert_eq!(plain, vec![0x03, 0x09, b'h', b'i']);
        assert_eq!(PacketType::Plain.framed_len(2), plain.len());

        let mut positional = Vec::new();
        PacketType::IBeacon.write_record(0xFF, &[0x00, 0x01], &mut positional);
        assert_eq!(positional, vec![0x00, 0x01]);
        assert_eq!(PacketType::IBeacon.framed_len(2), positional.len());
    }

    #[test]
    fn test_finalize_patches_ibeacon_lengths() {
        let mut full = IBEACON_HEADER.to_vec();
        full.resize(30, 0);
        PacketType::IBeacon.finalize(&mut full);
        assert_eq!(full[3], 0x1A);
        assert_eq!(full[8], 0x15);

        let mut header_only = IBEACON_HEADER.to_vec();
        PacketType::IBeacon.finalize(&mut header_only);
        assert_eq!(header_only[3], 0x05);
        assert_eq!(header_only[8], 0x00);
    }

    #[test]
    fn test_finalize_leaves_plain_untouched() {
        let mut bytes = PLAIN_HEADER.to_vec();
        bytes.extend([0x03, 0x09, b'h', b'i']);
        let before = bytes.clone();
        PacketType::Plain.finalize(&mut bytes);
        assert_eq!(bytes, before);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("iBeacon".parse::<PacketType>(), Ok(PacketType::IBeacon));
        assert_eq!("plain".parse::<PacketType>(), Ok(PacketType::Plain));
        assert!("eddystone".parse::<PacketType>().is_err());
    }
}
