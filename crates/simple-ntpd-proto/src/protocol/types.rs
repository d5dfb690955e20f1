// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::net::Ipv4Addr;

use super::{ConstPackedSizeBytes, MINPOLL};

/// **NTP Short Format** - Used in delay and dispersion header fields where the full resolution and
/// range of the other formats are not justified. It includes a 16-bit unsigned seconds field and a
/// 16-bit fraction field.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          Seconds              |           Fraction            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShortFormat {
    /// Seconds component (16-bit unsigned).
    pub seconds: u16,
    /// Fractional seconds component (16-bit unsigned).
    pub fraction: u16,
}

impl ShortFormat {
    /// Convert a duration in seconds to 16.16 fixed point, saturating at the
    /// representable range.
    pub fn from_seconds_f64(secs: f64) -> Self {
        let fixed = (secs * 65536.0).round().clamp(0.0, u32::MAX as f64) as u32;
        ShortFormat {
            seconds: (fixed >> 16) as u16,
            fraction: (fixed & 0xFFFF) as u16,
        }
    }

    /// The value in seconds.
    pub fn as_seconds_f64(&self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / 65536.0
    }
}

/// **NTP Timestamp Format** - Used in packet headers and other places with limited word size. It
/// includes a 32-bit unsigned seconds field spanning 136 years and a 32-bit fraction field
/// resolving 232 picoseconds.
///
/// The prime epoch is 0 h 1 January 1900 UTC, when all bits are zero. The seconds field wraps in
/// February 2036; see [`crate::unix_time::timestamp_to_instant`] for era-aware decoding.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Seconds                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Fraction                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimestampFormat {
    /// Seconds since 1900-01-01 00:00:00 UTC (32-bit unsigned).
    pub seconds: u32,
    /// Fractional seconds (32-bit unsigned, resolution of ~232 picoseconds).
    pub fraction: u32,
}

impl TimestampFormat {
    /// The all-zero timestamp, meaning "unset" on the wire.
    pub const ZERO: Self = TimestampFormat {
        seconds: 0,
        fraction: 0,
    };

    /// Whether both fields are zero.
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    /// The timestamp as one 64-bit fixed-point word (seconds in the high half).
    pub fn to_bits(&self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    /// Inverse of [`TimestampFormat::to_bits`].
    pub fn from_bits(bits: u64) -> Self {
        TimestampFormat {
            seconds: (bits >> 32) as u32,
            fraction: bits as u32,
        }
    }
}

/// A 2-bit integer warning of an impending leap second to be inserted or deleted in the last
/// minute of the current month.
///
/// Note that this field is packed in the actual header. Every 2-bit value has a variant, so a
/// decoded `LeapIndicator` is always in range.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum LeapIndicator {
    /// No leap required.
    #[default]
    NoWarning = 0,
    /// Last minute of the day has 61 seconds.
    AddOne = 1,
    /// Last minute of the day has 59 seconds.
    SubOne = 2,
    /// Clock unsynchronized.
    Unknown = 3,
}

impl LeapIndicator {
    /// Decode the low two bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddOne,
            2 => LeapIndicator::SubOne,
            _ => LeapIndicator::Unknown,
        }
    }
}

impl TryFrom<u8> for LeapIndicator {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 3 {
            return Err(());
        }
        Ok(LeapIndicator::from_bits(value))
    }
}

/// A 3-bit integer representing the NTP version number.
///
/// Note that while this struct is 8-bits, this field is packed to 3 in the actual header. The raw
/// value is kept so that packets with unsupported versions can still be decoded and reported.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version(pub(crate) u8);

impl Version {
    /// NTP version 3 (RFC 1305). Accepted from clients.
    pub const V3: Self = Version(3);
    /// NTP version 4 (RFC 5905). Emitted in every response.
    pub const V4: Self = Version(4);

    /// Create a `Version` from a raw version number.
    ///
    /// Returns `None` if the value does not fit in three bits.
    pub fn new(v: u8) -> Option<Self> {
        if v <= 0b111 { Some(Version(v)) } else { None }
    }

    /// Returns the raw version number as a `u8`.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether a server should accept requests carrying this version.
    pub fn is_supported(&self) -> bool {
        *self == Self::V3 || *self == Self::V4
    }
}

impl Default for Version {
    /// Defaults to NTPv4, the current standard (RFC 5905).
    fn default() -> Self {
        Version::V4
    }
}

/// A 3-bit integer representing the association mode.
///
/// Note that while this enum is 8-bits, this field is packed to 3 in the actual header. Every
/// 3-bit value has a variant.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Reserved mode (value 0).
    Reserved = 0,
    /// Symmetric active mode (value 1).
    SymmetricActive = 1,
    /// Symmetric passive mode (value 2).
    SymmetricPassive = 2,
    /// Client mode (value 3).
    #[default]
    Client = 3,
    /// Server mode (value 4).
    Server = 4,
    /// Broadcast mode (value 5).
    Broadcast = 5,
    /// NTP control message mode (value 6).
    NtpControlMessage = 6,
    /// Reserved for private use (value 7).
    ReservedForPrivateUse = 7,
}

impl Mode {
    /// Decode the low three bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::NtpControlMessage,
            _ => Mode::ReservedForPrivateUse,
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 7 {
            return Err(());
        }
        Ok(Mode::from_bits(value))
    }
}

/// An 8-bit integer representing the stratum.
///
/// ```ignore
/// +--------+-----------------------------------------------------+
/// | Value  | Meaning                                             |
/// +--------+-----------------------------------------------------+
/// | 0      | unspecified or invalid                              |
/// | 1      | primary server (e.g., equipped with a GPS receiver) |
/// | 2-15   | secondary server (via NTP)                          |
/// | 16     | unsynchronized                                      |
/// | 17-255 | reserved                                            |
/// +--------+-----------------------------------------------------+
/// ```
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Stratum(pub u8);

impl Stratum {
    /// Unspecified or invalid. Also used for Kiss-o'-Death responses.
    pub const UNSPECIFIED: Self = Stratum(0);
    /// The primary server (e.g. equipped with a GPS receiver).
    pub const PRIMARY: Self = Stratum(1);
    /// The minimum value specifying a secondary server (via NTP).
    pub const SECONDARY_MIN: Self = Stratum(2);
    /// The maximum value specifying a secondary server (via NTP).
    pub const SECONDARY_MAX: Self = Stratum(15);
    /// An unsynchronized stratum.
    pub const UNSYNCHRONIZED: Self = Stratum(16);

    /// Whether or not the stratum represents a secondary server.
    pub fn is_secondary(&self) -> bool {
        Self::SECONDARY_MIN <= *self && *self <= Self::SECONDARY_MAX
    }

    /// Whether a server may advertise this stratum (1 through 15).
    pub fn is_server_stratum(&self) -> bool {
        Self::PRIMARY <= *self && *self <= Self::SECONDARY_MAX
    }
}

/// A 32-bit code identifying the particular server or reference clock.
///
/// For stratum 0 this is a "kiss code" (see [`KissOfDeath`]); for stratum 1 a four-octet,
/// left-justified, zero-padded ASCII string naming the reference clock; for stratum 2 and above
/// conventionally the IPv4 address of the upstream server. The bytes are kept verbatim, so
/// decoding does not depend on the stratum.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ReferenceId(pub [u8; 4]);

impl ReferenceId {
    /// Build a reference identifier from the first four bytes of `code`, zero-padded on the
    /// right when `code` is shorter.
    ///
    /// ```
    /// use ntp_proto::protocol::ReferenceId;
    ///
    /// assert_eq!(ReferenceId::from_ascii("LOCAL").as_bytes(), *b"LOCA");
    /// assert_eq!(ReferenceId::from_ascii("GPS").as_bytes(), *b"GPS\0");
    /// ```
    pub fn from_ascii(code: &str) -> Self {
        let mut bytes = [0u8; 4];
        for (dst, src) in bytes.iter_mut().zip(code.as_bytes()) {
            *dst = *src;
        }
        ReferenceId(bytes)
    }

    /// Reference identifier for a secondary server synchronized to `addr`
    /// (RFC 5905 Section 7.3).
    pub fn from_ipv4(addr: Ipv4Addr) -> Self {
        ReferenceId(addr.octets())
    }

    /// Returns the raw 4-byte representation.
    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The identifier as a big-endian integer.
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<KissOfDeath> for ReferenceId {
    fn from(kod: KissOfDeath) -> Self {
        ReferenceId(kod.code())
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let printable = self.0[0].is_ascii_graphic()
            && self
                .0
                .iter()
                .all(|&b| b == 0 || b.is_ascii_graphic() || b == b' ');
        if !printable {
            return write!(f, "{}", Ipv4Addr::from(self.0));
        }
        for &b in self.0.iter().take_while(|&&b| b != 0) {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// If the Stratum field is 0, which implies unspecified or invalid, the Reference Identifier
/// field can be used to convey messages useful for status reporting and access control. These
/// are called **Kiss-o'-Death** (KoD) packets and the ASCII messages they convey are called
/// kiss codes.
///
/// Only the codes this server emits are modelled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KissOfDeath {
    /// Access denied by a deny rule. The client MUST stop sending packets to this server.
    Deny,
    /// Access restricted (client not on the allow list). The client MUST stop sending packets
    /// to this server.
    Rstr,
    /// Rate exceeded. The client MUST reduce its polling interval.
    Rate,
}

impl KissOfDeath {
    /// The four ASCII bytes of the kiss code.
    pub fn code(&self) -> [u8; 4] {
        match self {
            KissOfDeath::Deny => *b"DENY",
            KissOfDeath::Rstr => *b"RSTR",
            KissOfDeath::Rate => *b"RATE",
        }
    }
}

impl TryFrom<ReferenceId> for KissOfDeath {
    type Error = ();

    fn try_from(id: ReferenceId) -> Result<Self, Self::Error> {
        match &id.0 {
            b"DENY" => Ok(KissOfDeath::Deny),
            b"RSTR" => Ok(KissOfDeath::Rstr),
            b"RATE" => Ok(KissOfDeath::Rate),
            _ => Err(()),
        }
    }
}

impl fmt::Display for KissOfDeath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ReferenceId::from(*self).fmt(f)
    }
}

/// How a server should treat a decoded packet, derived from its mode alone.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PacketKind {
    /// Mode 3: answer it.
    ClientRequest,
    /// Mode 4: another server's reply, never answered.
    ServerResponse,
    /// Any other mode, never answered.
    Other,
}

/// **Packet Header** - The NTP packet header consists of an integral number of 32-bit (4 octet)
/// words in network byte order.
///
/// Only the fixed 48-byte header is modelled. Extension fields and MACs trailing a request are
/// ignored on parse and never produced on serialize.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |LI | VN  |Mode |    Stratum     |     Poll      |  Precision   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Delay                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Dispersion                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Reference ID                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                     Reference Timestamp (64)                  +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      Origin Timestamp (64)                    +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      Receive Timestamp (64)                   +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      Transmit Timestamp (64)                  +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Packet {
    /// Leap indicator warning of impending leap second.
    pub leap_indicator: LeapIndicator,
    /// NTP protocol version number.
    pub version: Version,
    /// Association mode (client, server, broadcast, etc.).
    pub mode: Mode,
    /// Stratum level of the time source.
    pub stratum: Stratum,
    /// 8-bit signed integer representing the maximum interval between successive messages, in log2
    /// seconds.
    pub poll: i8,
    /// 8-bit signed integer representing the precision of the system clock, in log2 seconds. For
    /// instance, a value of -18 corresponds to a precision of about one microsecond.
    pub precision: i8,
    /// Total round-trip delay to the reference clock, in NTP short format.
    pub root_delay: ShortFormat,
    /// Total dispersion to the reference clock, in NTP short format.
    pub root_dispersion: ShortFormat,
    /// Reference identifier (clock source, upstream address, or kiss code).
    pub reference_id: ReferenceId,
    /// Time when the system clock was last set or corrected.
    pub reference_timestamp: TimestampFormat,
    /// Time at the client when the request departed for the server.
    pub origin_timestamp: TimestampFormat,
    /// Time at the server when the request arrived from the client.
    pub receive_timestamp: TimestampFormat,
    /// Time at the server when the response left for the client.
    pub transmit_timestamp: TimestampFormat,
}

/// The consecutive types within the first packed byte in the NTP packet.
pub type PacketByte1 = (LeapIndicator, Version, Mode);

// Size implementations.

impl ConstPackedSizeBytes for ShortFormat {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl ConstPackedSizeBytes for TimestampFormat {
    const PACKED_SIZE_BYTES: usize = 8;
}

impl ConstPackedSizeBytes for Stratum {
    const PACKED_SIZE_BYTES: usize = 1;
}

impl ConstPackedSizeBytes for ReferenceId {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl ConstPackedSizeBytes for PacketByte1 {
    const PACKED_SIZE_BYTES: usize = 1;
}

impl ConstPackedSizeBytes for Packet {
    const PACKED_SIZE_BYTES: usize = PacketByte1::PACKED_SIZE_BYTES
        + Stratum::PACKED_SIZE_BYTES
        + 2
        + ShortFormat::PACKED_SIZE_BYTES * 2
        + ReferenceId::PACKED_SIZE_BYTES
        + TimestampFormat::PACKED_SIZE_BYTES * 4;
}

impl Default for Packet {
    /// Defaults to a valid NTPv4 client request template.
    ///
    /// All timestamp and delay fields are zeroed and the poll exponent is `MINPOLL`. Set
    /// `transmit_timestamp` before sending.
    fn default() -> Self {
        Packet {
            leap_indicator: LeapIndicator::default(),
            version: Version::default(),
            mode: Mode::default(),
            stratum: Stratum::default(),
            poll: MINPOLL as i8,
            precision: 0,
            root_delay: ShortFormat::default(),
            root_dispersion: ShortFormat::default(),
            reference_id: ReferenceId::default(),
            reference_timestamp: TimestampFormat::default(),
            origin_timestamp: TimestampFormat::default(),
            receive_timestamp: TimestampFormat::default(),
            transmit_timestamp: TimestampFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_is_48_bytes() {
        assert_eq!(Packet::PACKED_SIZE_BYTES, 48);
    }

    #[test]
    fn reference_id_pads_and_truncates() {
        assert_eq!(ReferenceId::from_ascii("").as_bytes(), [0, 0, 0, 0]);
        assert_eq!(ReferenceId::from_ascii("GPS").as_bytes(), *b"GPS\0");
        assert_eq!(ReferenceId::from_ascii("LOCL").as_bytes(), *b"LOCL");
        assert_eq!(ReferenceId::from_ascii("LOCAL").as_bytes(), *b"LOCA");
    }

    #[test]
    fn reference_id_big_endian_packing() {
        assert_eq!(ReferenceId::from_ascii("ABCD").to_u32(), 0x4142_4344);
    }

    #[test]
    fn reference_id_display() {
        assert_eq!(ReferenceId::from_ascii("GPS").to_string(), "GPS");
        assert_eq!(
            ReferenceId::from_ipv4(Ipv4Addr::new(192, 168, 1, 10)).to_string(),
            "192.168.1.10"
        );
    }

    #[test]
    fn kiss_codes_roundtrip_through_reference_id() {
        for kod in [KissOfDeath::Deny, KissOfDeath::Rstr, KissOfDeath::Rate] {
            let id = ReferenceId::from(kod);
            assert_eq!(KissOfDeath::try_from(id), Ok(kod));
        }
        assert!(KissOfDeath::try_from(ReferenceId::from_ascii("LOCL")).is_err());
    }

    #[test]
    fn leap_and_mode_cover_every_bit_pattern() {
        for bits in 0..4u8 {
            assert_eq!(LeapIndicator::from_bits(bits) as u8, bits);
        }
        for bits in 0..8u8 {
            assert_eq!(Mode::from_bits(bits) as u8, bits);
        }
        assert!(LeapIndicator::try_from(4).is_err());
        assert!(Mode::try_from(8).is_err());
    }

    #[test]
    fn version_support() {
        assert!(Version::V3.is_supported());
        assert!(Version::V4.is_supported());
        assert!(!Version(2).is_supported());
        assert!(!Version(5).is_supported());
        assert_eq!(Version::new(8), None);
    }

    #[test]
    fn stratum_ranges() {
        assert!(!Stratum(0).is_server_stratum());
        assert!(Stratum(1).is_server_stratum());
        assert!(Stratum(15).is_server_stratum());
        assert!(!Stratum(16).is_server_stratum());
        assert!(Stratum(2).is_secondary());
        assert!(!Stratum(1).is_secondary());
    }

    #[test]
    fn short_format_seconds() {
        let s = ShortFormat::from_seconds_f64(1.5);
        assert_eq!(s.seconds, 1);
        assert_eq!(s.fraction, 0x8000);
        assert!((s.as_seconds_f64() - 1.5).abs() < 1e-9);
        assert_eq!(ShortFormat::from_seconds_f64(-1.0), ShortFormat::default());
    }

    #[test]
    fn timestamp_bits() {
        let ts = TimestampFormat {
            seconds: 0xE000_0000,
            fraction: 0x1234_5678,
        };
        assert_eq!(ts.to_bits(), 0xE000_0000_1234_5678);
        assert_eq!(TimestampFormat::from_bits(ts.to_bits()), ts);
        assert!(TimestampFormat::ZERO.is_zero());
    }
}
