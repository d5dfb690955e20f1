// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use crate::error::{ValidationError, Violation};

use super::{MAXPOLL, MINPOLL, Mode, Packet, PacketKind, Stratum};

impl Packet {
    /// Check every header field rule and report all violations.
    ///
    /// The rules are: version 3 or 4, stratum at most 15, poll exponent within
    /// `MINPOLL..=MAXPOLL`, and precision exponent not positive. Leap indicator
    /// and mode are always in range once decoded.
    ///
    /// ```
    /// use ntp_proto::protocol::Packet;
    ///
    /// let mut p = Packet::default();
    /// assert!(p.validate().is_ok());
    /// p.poll = 3;
    /// p.precision = 1;
    /// assert_eq!(p.validate().unwrap_err().violations.len(), 2);
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        if !self.version.is_supported() {
            violations.push(Violation::UnsupportedVersion(self.version.value()));
        }
        if self.stratum > Stratum::SECONDARY_MAX {
            violations.push(Violation::StratumOutOfRange(self.stratum.0));
        }
        if !(MINPOLL as i8..=MAXPOLL as i8).contains(&self.poll) {
            violations.push(Violation::PollOutOfRange(self.poll));
        }
        if self.precision > 0 {
            violations.push(Violation::PositivePrecision(self.precision));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Whether [`Packet::validate`] finds no violations.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Classify the packet by its mode.
    pub fn classify(&self) -> PacketKind {
        match self.mode {
            Mode::Client => PacketKind::ClientRequest,
            Mode::Server => PacketKind::ServerResponse,
            _ => PacketKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Version;

    #[test]
    fn default_template_is_valid() {
        assert!(Packet::default().is_valid());
    }

    #[test]
    fn version_three_accepted() {
        let p = Packet {
            version: Version::V3,
            ..Packet::default()
        };
        assert!(p.is_valid());
    }

    #[test]
    fn each_rule_reported() {
        let p = Packet {
            version: Version(5),
            stratum: Stratum(16),
            poll: 18,
            precision: 1,
            ..Packet::default()
        };
        let err = p.validate().unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::UnsupportedVersion(5),
                Violation::StratumOutOfRange(16),
                Violation::PollOutOfRange(18),
                Violation::PositivePrecision(1),
            ]
        );
        assert!(!p.is_valid());
    }

    #[test]
    fn poll_boundaries() {
        for (poll, ok) in [(3, false), (4, true), (17, true), (18, false), (-1, false)] {
            let p = Packet {
                poll,
                ..Packet::default()
            };
            assert_eq!(p.is_valid(), ok, "poll {}", poll);
        }
    }

    #[test]
    fn stratum_boundary() {
        let at_max = Packet {
            stratum: Stratum(15),
            ..Packet::default()
        };
        assert!(at_max.is_valid());
        let above = Packet {
            stratum: Stratum(16),
            ..Packet::default()
        };
        assert!(!above.is_valid());
    }

    #[test]
    fn precision_zero_allowed() {
        let p = Packet {
            precision: 0,
            ..Packet::default()
        };
        assert!(p.is_valid());
    }

    #[test]
    fn classify_by_mode() {
        for bits in 0..8u8 {
            let p = Packet {
                mode: Mode::from_bits(bits),
                ..Packet::default()
            };
            let expected = match bits {
                3 => PacketKind::ClientRequest,
                4 => PacketKind::ServerResponse,
                _ => PacketKind::Other,
            };
            assert_eq!(p.classify(), expected);
        }
    }
}
