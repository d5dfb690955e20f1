// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use crate::clock::Clock;
use crate::protocol::{self, ConstPackedSizeBytes};

use super::ServerSystemState;

/// Build an NTP server response packet for a client request.
///
/// Per RFC 5905 Section 8:
/// - `origin_timestamp` is set to the client's `transmit_timestamp` (anti-replay)
/// - `receive_timestamp` is T2 (when the request arrived)
/// - `reference_timestamp` is T2 as well; this server has no separate sync event
/// - `transmit_timestamp` is left zero (patched with T3 by [`serialize_response`])
/// - `version` is always 4 and `mode` is `Server`
pub fn build_server_response(
    request: &protocol::Packet,
    server_state: &ServerSystemState,
    t2: protocol::TimestampFormat,
) -> protocol::Packet {
    protocol::Packet {
        leap_indicator: server_state.leap_indicator,
        version: protocol::Version::V4,
        mode: protocol::Mode::Server,
        stratum: server_state.stratum,
        poll: server_state.poll,
        precision: server_state.precision,
        root_delay: server_state.root_delay,
        root_dispersion: server_state.root_dispersion,
        reference_id: server_state.reference_id,
        reference_timestamp: t2,
        origin_timestamp: request.transmit_timestamp,
        receive_timestamp: t2,
        transmit_timestamp: protocol::TimestampFormat::ZERO,
    }
}

/// Build a complete response with default system state, reading every
/// timestamp from `clock`.
///
/// The receive timestamp is read first and the transmit timestamp last.
///
/// ```
/// use ntp_server::clock::ManualClock;
/// use ntp_server::protocol::{Mode, Packet, TimestampFormat};
/// use ntp_server::server_common::build_response;
///
/// let t = TimestampFormat { seconds: 3_913_056_000, fraction: 0 };
/// let clock = ManualClock::new(t);
/// let request = Packet { transmit_timestamp: t, ..Packet::default() };
/// let response = build_response(&request, 2, "LOCL", &clock);
/// assert_eq!(response.mode, Mode::Server);
/// assert_eq!(response.origin_timestamp, t);
/// ```
pub fn build_response(
    request: &protocol::Packet,
    stratum: u8,
    reference_id: &str,
    clock: &dyn Clock,
) -> protocol::Packet {
    let t2 = clock.now();
    let state = ServerSystemState::new(stratum, reference_id);
    let mut response = build_server_response(request, &state, t2);
    response.transmit_timestamp = clock.now();
    response
}

/// Build a Kiss-o'-Death (KoD) response packet.
///
/// Per RFC 5905 Section 7.4, KoD packets have stratum 0 and the reference
/// identifier set to the kiss code.
pub(crate) fn build_kod_response(
    request: &protocol::Packet,
    kod: protocol::KissOfDeath,
) -> protocol::Packet {
    protocol::Packet {
        leap_indicator: protocol::LeapIndicator::Unknown,
        version: protocol::Version::V4,
        mode: protocol::Mode::Server,
        stratum: protocol::Stratum::UNSPECIFIED,
        poll: request.poll,
        precision: 0,
        root_delay: protocol::ShortFormat::default(),
        root_dispersion: protocol::ShortFormat::default(),
        reference_id: kod.into(),
        reference_timestamp: protocol::TimestampFormat::ZERO,
        origin_timestamp: request.transmit_timestamp,
        receive_timestamp: protocol::TimestampFormat::ZERO,
        transmit_timestamp: protocol::TimestampFormat::ZERO,
    }
}

/// Serialize a response packet and stamp T3 (transmit timestamp) from `clock`
/// as the last step before the bytes are returned.
pub fn serialize_response(
    response: &protocol::Packet,
    clock: &dyn Clock,
) -> [u8; protocol::Packet::PACKED_SIZE_BYTES] {
    let mut buf = protocol::serialize(response);
    protocol::patch_transmit_timestamp(&mut buf, clock.now());
    buf
}
