//! Payload encoder
//!
//! Packs an ordered list of [`StructRecord`]s behind a [`PacketType`] header into a
//! legacy advertisement payload. Encoding is pure: the same inputs always produce the
//! same bytes, and an oversize or invalid record list produces an error and no bytes.

use core::fmt;
use core::ops::Deref;
use smallvec::SmallVec;

use super::packet_type::PacketType;
use super::record::StructRecord;
use super::{parse_ad_structures, MAX_ADVERTISEMENT_LEN};
use crate::errors::EncodingError;

// ----------------------------------------------------------------------------
// Advertisement Payload
// ----------------------------------------------------------------------------

/// Encoded advertisement, at most [`MAX_ADVERTISEMENT_LEN`] bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdvertisementPayload {
    bytes: SmallVec<[u8; MAX_ADVERTISEMENT_LEN]>,
    packet_type: PacketType,
    record_count: usize,
}

impl AdvertisementPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Number of records packed after the header
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// `(ad_type, data)` pairs of the top-level AD structures
    pub fn ad_structures(&self) -> Vec<(u8, &[u8])> {
        parse_ad_structures(&self.bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl Deref for AdvertisementPayload {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl AsRef<[u8]> for AdvertisementPayload {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for AdvertisementPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ----------------------------------------------------------------------------
// Encoder
// ----------------------------------------------------------------------------

/// Encoder bound to one packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadEncoder {
    packet_type: PacketType,
}

impl PayloadEncoder {
    pub fn new(packet_type: PacketType) -> Self {
        Self { packet_type }
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Encode `records` in order
    ///
    /// Fails with `InvalidRecordValue` for the first record whose text does not validate,
    /// or `PayloadTooLarge` for the first record that would push the payload past 31 bytes.
    pub fn encode(&self, records: &[StructRecord]) -> Result<AdvertisementPayload, EncodingError> {
        let packet_type = self.packet_type;
        let order = packet_type.byte_order();

        let mut bytes: SmallVec<[u8; MAX_ADVERTISEMENT_LEN]> =
            SmallVec::from_slice(packet_type.header());

        for (index, record) in records.iter().enumerate() {
            let value = record
                .encode_value(order)
                .map_err(|reason| EncodingError::InvalidRecordValue { index, reason })?;

            let size = bytes.len() + packet_type.framed_len(value.len());
            if size > MAX_ADVERTISEMENT_LEN {
                return Err(EncodingError::PayloadTooLarge {
                    index,
                    size,
                    max: MAX_ADVERTISEMENT_LEN,
                });
            }

            packet_type.write_record(record.struct_type().tag(), &value, &mut bytes);
        }

        packet_type.finalize(&mut bytes);

        Ok(AdvertisementPayload {
            bytes,
            packet_type,
            record_count: records.len(),
        })
    }
}

/// Encode `records` behind the `packet_type` header
pub fn encode(
    packet_type: PacketType,
    records: &[StructRecord],
) -> Result<AdvertisementPayload, EncodingError> {
    PayloadEncoder::new(packet_type).encode(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValueError;
    use crate::protocol::struct_type::StructType;
    use crate::protocol::{AD_TYPE_COMPLETE_LOCAL_NAME, AD_TYPE_FLAGS};

    fn record(ty: StructType, raw: &str) -> StructRecord {
        StructRecord::new(ty, raw)
    }

    #[test]
    fn test_plain_text() {
        let payload = encode(PacketType::Plain, &[record(StructType::Text, "hi")]).unwrap();
        assert_eq!(payload.as_bytes(), &[0x02, 0x01, 0x06, 0x03, 0x09, 0x68, 0x69]);
        assert_eq!(payload.record_count(), 1);
        assert_eq!(payload.to_string(), "02010603096869");

        let structures = payload.ad_structures();
        assert_eq!(structures[0], (AD_TYPE_FLAGS, &[0x06][..]));
        assert_eq!(structures[1], (AD_TYPE_COMPLETE_LOCAL_NAME, &b"hi"[..]));
    }

    #[test]
    fn test_empty_record_list_is_header_only() {
        let plain = encode(PacketType::Plain, &[]).unwrap();
        assert_eq!(plain.as_bytes(), PacketType::Plain.header());
        assert_eq!(plain.record_count(), 0);

        let ibeacon = encode(PacketType::IBeacon, &[]).unwrap();
        assert_eq!(ibeacon.len(), 9);
    }

    #[test]
    fn test_canonical_ibeacon() {
        let records = [
            record(StructType::Uuid128, "e2c56db5-dffb-48d2-b060-d0f5a71096e0"),
            record(StructType::MajorMinor, "1:42"),
            record(StructType::TxPower, "-59"),
        ];
        let payload = encode(PacketType::IBeacon, &records).unwrap();
        assert_eq!(payload.len(), 30);
        assert_eq!(
            &payload[..9],
            &[0x02, 0x01, 0x06, 0x1A, 0xFF, 0x4C, 0x00, 0x02, 0x15]
        );
        assert_eq!(&payload[9..13], &[0xE2, 0xC5, 0x6D, 0xB5]);
        assert_eq!(&payload[25..29], &[0x00, 0x01, 0x00, 0x2A]);
        assert_eq!(payload[29], 0xC5);
    }

    #[test]
    fn test_overflow_reports_record_index() {
        let records = [
            record(StructType::Text, "abcdefghijklmnopqrstuvwxyz"),
            record(StructType::TxPower, "-59"),
        ];
        assert_eq!(
            encode(PacketType::Plain, &records[..1]).unwrap().len(),
            MAX_ADVERTISEMENT_LEN
        );
        assert_eq!(
            encode(PacketType::Plain, &records),
            Err(EncodingError::PayloadTooLarge { index: 1, size: 34, max: 31 })
        );
    }

    #[test]
    fn test_invalid_value_reports_record_index() {
        let records = [
            record(StructType::Text, "ok"),
            record(StructType::Uuid16, "18D"),
        ];
        assert_eq!(
            encode(PacketType::Plain, &records),
            Err(EncodingError::InvalidRecordValue {
                index: 1,
                reason: ValueError::WrongDigitCount { expected: 4, actual: 3 },
            })
        );
    }

    #[test]
    fn test_encoder_is_deterministic() {
        let encoder = PayloadEncoder::new(PacketType::Plain);
        let records = [
            record(StructType::Uuid16, "180D"),
            record(StructType::Url, "https://a.io"),
        ];
        assert_eq!(encoder.encode(&records), encoder.encode(&records));
    }
}
