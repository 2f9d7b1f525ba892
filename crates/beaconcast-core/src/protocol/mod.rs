//! Advertisement payload protocol
//!
//! - [`struct_type`] - typed record kinds with their validation and encoding rules
//! - [`record`] - the operator's `(type, text)` records
//! - [`packet_type`] - header framings wrapping the records
//! - [`encoder`] - packs records into a legacy advertisement payload

pub mod encoder;
pub mod packet_type;
pub mod record;
pub mod struct_type;

// ----------------------------------------------------------------------------
// Advertising Data Constants
// ----------------------------------------------------------------------------

/// Hard limit of a legacy advertisement payload
pub const MAX_ADVERTISEMENT_LEN: usize = 31;

pub const AD_TYPE_FLAGS: u8 = 0x01;
pub const AD_TYPE_16BIT_SERVICE_UUID_COMPLETE: u8 = 0x03;
pub const AD_TYPE_128BIT_SERVICE_UUID_COMPLETE: u8 = 0x07;
pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const AD_TYPE_TX_POWER_LEVEL: u8 = 0x0A;
pub const AD_TYPE_APPEARANCE: u8 = 0x19;
pub const AD_TYPE_URI: u8 = 0x24;
pub const AD_TYPE_MANUFACTURER_SPECIFIC: u8 = 0xFF;

/// LE General Discoverable Mode | BR/EDR Not Supported
pub const FLAGS_GENERAL_DISCOVERABLE_LE_ONLY: u8 = 0x06;

/// Apple's company identifier, little-endian as it appears on air
pub const APPLE_COMPANY_ID: [u8; 2] = [0x4C, 0x00];
pub const IBEACON_TYPE: u8 = 0x02;

// URI scheme name string code points
pub const URI_SCHEME_HTTP: u8 = 0x16;
pub const URI_SCHEME_HTTPS: u8 = 0x17;

/// Split an advertisement payload into `(ad_type, data)` pairs
///
/// Stops at the first zero length or at a structure that runs past the end.
pub fn parse_ad_structures(data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i] as usize;
        if length == 0 || i + 1 + length > data.len() {
            break;
        }

        result.push((data[i + 1], &data[i + 2..i + 1 + length]));
        i += 1 + length;
    }

    result
}
