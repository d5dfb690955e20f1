// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Types and constants that precisely match the NTPv4 header (RFC 5905 Section 7.3).
//!
//! Provides [`FromBytes`] and [`ToBytes`] implementations for every header type, the
//! [`parse`] / [`serialize`] conveniences used on the server path, and the field
//! validation and classification rules applied to received packets.
//!
//! Documentation is largely derived (and often copied directly) from IETF RFC 5905.

/// NTP port number.
pub const PORT: u16 = 123;

/// Minimum poll exponent (16 s).
pub const MINPOLL: u8 = 4;

/// Maximum poll exponent (36 h).
pub const MAXPOLL: u8 = 17;

/// Maximum stratum number.
pub const MAXSTRAT: u8 = 16;

mod bytes;
mod traits;
mod types;
mod validate;

pub use self::bytes::patch_transmit_timestamp;
pub use self::traits::*;
pub use self::types::*;

use crate::error::ParseError;

/// Parse a 48-byte NTP header from the front of `buf`.
///
/// Trailing bytes (extension fields, MACs) are ignored. Field values are not range-checked;
/// call [`Packet::validate`] for that.
///
/// ```
/// use ntp_proto::protocol::{self, Mode};
///
/// let mut buf = [0u8; 48];
/// buf[0] = 0x23; // LI=0, VN=4, Mode=3
/// let packet = protocol::parse(&buf).unwrap();
/// assert_eq!(packet.mode, Mode::Client);
/// assert!(protocol::parse(&buf[..47]).is_err());
/// ```
pub fn parse(buf: &[u8]) -> Result<Packet, ParseError> {
    Packet::from_bytes(buf).map(|(packet, _)| packet)
}

/// Serialize `packet` into its 48-byte wire form.
pub fn serialize(packet: &Packet) -> [u8; Packet::PACKED_SIZE_BYTES] {
    let mut buf = [0u8; Packet::PACKED_SIZE_BYTES];
    packet.write_header(&mut buf);
    buf
}
