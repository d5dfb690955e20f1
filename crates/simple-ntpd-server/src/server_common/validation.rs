// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use crate::error::{ParseError, ProtocolError};
use crate::protocol::{self, PacketKind};

/// Decide whether a received datagram is an answerable client request.
///
/// Applies, in order: the 48-byte minimum, the header field rules
/// ([`Packet::validate`](protocol::Packet::validate)), and the mode check.
/// Returns the parsed packet on success.
pub(crate) fn validate_client_request(recv_buf: &[u8]) -> Result<protocol::Packet, ProtocolError> {
    let request = protocol::parse(recv_buf).map_err(|e| match e {
        ParseError::TooShort { available, .. } => ProtocolError::RequestTooShort {
            received: available,
        },
    })?;

    request.validate().map_err(ProtocolError::InvalidRequest)?;

    match request.classify() {
        PacketKind::ClientRequest => Ok(request),
        PacketKind::ServerResponse | PacketKind::Other => Err(ProtocolError::UnexpectedMode {
            mode: request.mode as u8,
        }),
    }
}
