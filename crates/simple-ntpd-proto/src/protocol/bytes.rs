// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use byteorder::{BigEndian, ByteOrder};

use crate::error::ParseError;

use super::traits::ensure_len;
use super::{
    ConstPackedSizeBytes, FromBytes, LeapIndicator, Mode, Packet, PacketByte1, ReferenceId,
    ShortFormat, Stratum, TimestampFormat, ToBytes, Version,
};

// Byte offsets of the header fields.
const OFF_ROOT_DELAY: usize = 4;
const OFF_ROOT_DISPERSION: usize = 8;
const OFF_REFERENCE_ID: usize = 12;
const OFF_REFERENCE_TS: usize = 16;
const OFF_ORIGIN_TS: usize = 24;
const OFF_RECEIVE_TS: usize = 32;
const OFF_TRANSMIT_TS: usize = 40;

impl FromBytes for ShortFormat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let seconds = BigEndian::read_u16(&buf[0..2]);
        let fraction = BigEndian::read_u16(&buf[2..4]);
        Ok((ShortFormat { seconds, fraction }, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for TimestampFormat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let seconds = BigEndian::read_u32(&buf[0..4]);
        let fraction = BigEndian::read_u32(&buf[4..8]);
        Ok((
            TimestampFormat { seconds, fraction },
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

impl FromBytes for ReferenceId {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        Ok((
            ReferenceId([buf[0], buf[1], buf[2], buf[3]]),
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

impl FromBytes for PacketByte1 {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let li_vn_mode = buf[0];
        let li = LeapIndicator::from_bits(li_vn_mode >> 6);
        let vn = Version((li_vn_mode >> 3) & 0b111);
        let mode = Mode::from_bits(li_vn_mode);
        Ok(((li, vn, mode), Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for Packet {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;

        let ((leap_indicator, version, mode), _) = PacketByte1::from_bytes(buf)?;
        let stratum = Stratum(buf[1]);
        let poll = buf[2] as i8;
        let precision = buf[3] as i8;
        let (root_delay, _) = ShortFormat::from_bytes(&buf[OFF_ROOT_DELAY..])?;
        let (root_dispersion, _) = ShortFormat::from_bytes(&buf[OFF_ROOT_DISPERSION..])?;
        let (reference_id, _) = ReferenceId::from_bytes(&buf[OFF_REFERENCE_ID..])?;
        let (reference_timestamp, _) = TimestampFormat::from_bytes(&buf[OFF_REFERENCE_TS..])?;
        let (origin_timestamp, _) = TimestampFormat::from_bytes(&buf[OFF_ORIGIN_TS..])?;
        let (receive_timestamp, _) = TimestampFormat::from_bytes(&buf[OFF_RECEIVE_TS..])?;
        let (transmit_timestamp, _) = TimestampFormat::from_bytes(&buf[OFF_TRANSMIT_TS..])?;

        Ok((
            Packet {
                leap_indicator,
                version,
                mode,
                stratum,
                poll,
                precision,
                root_delay,
                root_dispersion,
                reference_id,
                reference_timestamp,
                origin_timestamp,
                receive_timestamp,
                transmit_timestamp,
            },
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

// Writers.

impl ToBytes for ShortFormat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        BigEndian::write_u16(&mut buf[0..2], self.seconds);
        BigEndian::write_u16(&mut buf[2..4], self.fraction);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for TimestampFormat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        BigEndian::write_u32(&mut buf[0..4], self.seconds);
        BigEndian::write_u32(&mut buf[4..8], self.fraction);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for ReferenceId {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        buf[..4].copy_from_slice(&self.0);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for PacketByte1 {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let (li, vn, mode) = *self;
        buf[0] = ((li as u8) << 6) | ((vn.0 & 0b111) << 3) | (mode as u8);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for Packet {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let mut offset = 0;

        offset += (self.leap_indicator, self.version, self.mode).to_bytes(&mut buf[offset..])?;
        buf[offset] = self.stratum.0;
        offset += Stratum::PACKED_SIZE_BYTES;
        buf[offset] = self.poll as u8;
        offset += 1;
        buf[offset] = self.precision as u8;
        offset += 1;
        offset += self.root_delay.to_bytes(&mut buf[offset..])?;
        offset += self.root_dispersion.to_bytes(&mut buf[offset..])?;
        offset += self.reference_id.to_bytes(&mut buf[offset..])?;
        offset += self.reference_timestamp.to_bytes(&mut buf[offset..])?;
        offset += self.origin_timestamp.to_bytes(&mut buf[offset..])?;
        offset += self.receive_timestamp.to_bytes(&mut buf[offset..])?;
        offset += self.transmit_timestamp.to_bytes(&mut buf[offset..])?;

        Ok(offset)
    }
}

impl Packet {
    /// Infallible header writer for a buffer of exactly the header size.
    pub(crate) fn write_header(&self, buf: &mut [u8; Packet::PACKED_SIZE_BYTES]) {
        buf[0] = ((self.leap_indicator as u8) << 6)
            | ((self.version.0 & 0b111) << 3)
            | (self.mode as u8);
        buf[1] = self.stratum.0;
        buf[2] = self.poll as u8;
        buf[3] = self.precision as u8;
        BigEndian::write_u16(&mut buf[4..6], self.root_delay.seconds);
        BigEndian::write_u16(&mut buf[6..8], self.root_delay.fraction);
        BigEndian::write_u16(&mut buf[8..10], self.root_dispersion.seconds);
        BigEndian::write_u16(&mut buf[10..12], self.root_dispersion.fraction);
        buf[OFF_REFERENCE_ID..OFF_REFERENCE_TS].copy_from_slice(&self.reference_id.0);
        let timestamps = [
            (OFF_REFERENCE_TS, self.reference_timestamp),
            (OFF_ORIGIN_TS, self.origin_timestamp),
            (OFF_RECEIVE_TS, self.receive_timestamp),
            (OFF_TRANSMIT_TS, self.transmit_timestamp),
        ];
        for (off, ts) in timestamps {
            BigEndian::write_u64(&mut buf[off..off + 8], ts.to_bits());
        }
    }
}

/// Overwrite the transmit timestamp of an already-serialized header in place.
///
/// Lets a server take T3 at the last moment before the datagram leaves.
pub fn patch_transmit_timestamp(
    buf: &mut [u8; Packet::PACKED_SIZE_BYTES],
    transmit: TimestampFormat,
) {
    BigEndian::write_u64(&mut buf[OFF_TRANSMIT_TS..], transmit.to_bits());
}
