// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use crate::error::ConfigError;
use crate::protocol::{self, MAXPOLL, MINPOLL};

/// Poll exponent advertised when none is configured (16 s).
pub const DEFAULT_POLL: i8 = MINPOLL as i8;

/// Precision exponent advertised when none is configured (about 15.6 ms).
pub const DEFAULT_PRECISION: i8 = -6;

/// Reference identifier used when none is configured.
pub const DEFAULT_REFERENCE_ID: &str = "LOCL";

/// Server-wide system variables (RFC 5905 Section 11).
///
/// These values are copied into every response packet. They can be updated at
/// runtime by obtaining a write lock on the `Arc<RwLock<ServerSystemState>>`
/// returned by [`NtpServer::system_state`](crate::server::NtpServer::system_state).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServerSystemState {
    /// Leap indicator warning of impending leap second.
    pub leap_indicator: protocol::LeapIndicator,
    /// Stratum level of this server.
    pub stratum: protocol::Stratum,
    /// Advertised poll exponent, in log2 seconds.
    pub poll: i8,
    /// Precision of the server's clock, in log2 seconds (e.g., -20 ≈ 1μs).
    pub precision: i8,
    /// Total round-trip delay to the primary reference source.
    pub root_delay: protocol::ShortFormat,
    /// Total dispersion to the primary reference source.
    pub root_dispersion: protocol::ShortFormat,
    /// Reference clock identifier (e.g., GPS, LOCL, or upstream server IP).
    pub reference_id: protocol::ReferenceId,
}

impl ServerSystemState {
    /// State for a server at `stratum` identifying its source as `reference_id`,
    /// with every other field at its default.
    pub fn new(stratum: u8, reference_id: &str) -> Self {
        ServerSystemState {
            stratum: protocol::Stratum(stratum),
            reference_id: protocol::ReferenceId::from_ascii(reference_id),
            ..Default::default()
        }
    }

    /// Check that the values can be put on the wire as a valid server response.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stratum.is_server_stratum() {
            return Err(ConfigError::InvalidStratum {
                stratum: self.stratum.0,
            });
        }
        if !(MINPOLL as i8..=MAXPOLL as i8).contains(&self.poll) {
            return Err(ConfigError::InvalidPoll { poll: self.poll });
        }
        if self.precision > 0 {
            return Err(ConfigError::InvalidPrecision {
                precision: self.precision,
            });
        }
        Ok(())
    }
}

impl Default for ServerSystemState {
    fn default() -> Self {
        ServerSystemState {
            leap_indicator: protocol::LeapIndicator::NoWarning,
            stratum: protocol::Stratum::SECONDARY_MIN,
            poll: DEFAULT_POLL,
            precision: DEFAULT_PRECISION,
            root_delay: protocol::ShortFormat::default(),
            root_dispersion: protocol::ShortFormat::default(),
            reference_id: protocol::ReferenceId::from_ascii(DEFAULT_REFERENCE_ID),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = ServerSystemState::default();
        assert_eq!(state.stratum, protocol::Stratum(2));
        assert_eq!(state.poll, 4);
        assert_eq!(state.precision, -6);
        assert_eq!(state.reference_id.as_bytes(), *b"LOCL");
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_new_pads_reference_id() {
        let state = ServerSystemState::new(1, "GPS");
        assert_eq!(state.stratum, protocol::Stratum::PRIMARY);
        assert_eq!(state.reference_id.as_bytes(), *b"GPS\0");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let state = ServerSystemState::new(0, "LOCL");
        assert_eq!(
            state.validate(),
            Err(ConfigError::InvalidStratum { stratum: 0 })
        );
        let state = ServerSystemState::new(16, "LOCL");
        assert!(state.validate().is_err());

        let state = ServerSystemState {
            poll: 3,
            ..Default::default()
        };
        assert_eq!(state.validate(), Err(ConfigError::InvalidPoll { poll: 3 }));

        let state = ServerSystemState {
            precision: 1,
            ..Default::default()
        };
        assert_eq!(
            state.validate(),
            Err(ConfigError::InvalidPrecision { precision: 1 })
        );
    }
}
