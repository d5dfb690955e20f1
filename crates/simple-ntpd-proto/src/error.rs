// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for NTP packet parsing and validation.
//!
//! [`ParseError`] covers structural failures (the datagram cannot hold a header at
//! all). [`ValidationError`] covers headers that decode but carry field values a
//! server must not answer. Both convert into [`std::io::Error`] so callers on the
//! socket path can propagate them with `?`.

use std::fmt;

/// Errors that can occur during buffer-based NTP packet parsing or serialization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The buffer is too short for the expected data.
    TooShort {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TooShort { needed, available } => {
                write!(
                    f,
                    "buffer too short: needed {} bytes, got {}",
                    needed, available
                )
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for std::io::Error {
    fn from(err: ParseError) -> std::io::Error {
        let kind = match &err {
            ParseError::TooShort { .. } => std::io::ErrorKind::UnexpectedEof,
        };
        std::io::Error::new(kind, err)
    }
}

/// A single header field that is out of its permitted range.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Violation {
    /// Version number other than 3 or 4.
    UnsupportedVersion(u8),
    /// Stratum above 15.
    StratumOutOfRange(u8),
    /// Poll exponent outside `MINPOLL..=MAXPOLL`.
    PollOutOfRange(i8),
    /// Precision exponent above zero.
    PositivePrecision(i8),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnsupportedVersion(v) => write!(f, "unsupported version {}", v),
            Violation::StratumOutOfRange(s) => write!(f, "stratum {} out of range 0-15", s),
            Violation::PollOutOfRange(p) => write!(f, "poll {} out of range 4-17", p),
            Violation::PositivePrecision(p) => write!(f, "precision {} is positive", p),
        }
    }
}

/// The packet decoded but one or more header fields are invalid.
///
/// Carries every violation found, in header order. Used for diagnostics only:
/// an invalid packet is dropped regardless of which rule it broke.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    /// The violated field rules, in header order. Never empty.
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid packet: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for std::io::Error {
    fn from(err: ValidationError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}
