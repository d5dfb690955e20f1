// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Custom error types for the NTP server.
//!
//! All public APIs return `io::Result<T>`. Internally, errors are constructed as
//! `NtpServerError` variants and converted to `io::Error` automatically via
//! `From<NtpServerError> for io::Error`.
//!
//! Users who want programmatic error matching can downcast via
//! `io::Error::get_ref()`:
//!
//! ```no_run
//! use ntp_server::error::NtpServerError;
//!
//! # fn example(result: std::io::Result<()>) {
//! match result {
//!     Ok(()) => println!("server stopped"),
//!     Err(e) => {
//!         if let Some(srv_err) = e.get_ref()
//!             .and_then(|inner| inner.downcast_ref::<NtpServerError>())
//!         {
//!             match srv_err {
//!                 NtpServerError::Config(c) => eprintln!("bad configuration: {c}"),
//!                 _ => eprintln!("server error: {srv_err}"),
//!             }
//!         }
//!     }
//! }
//! # }
//! ```

pub use ntp_proto::error::{ParseError, ValidationError, Violation};

use std::fmt;
use std::io;

/// Errors that can occur during NTP server operations.
#[derive(Debug)]
pub enum NtpServerError {
    /// A received datagram is not an answerable client request.
    Protocol(ProtocolError),
    /// Invalid configuration (bad addresses, out-of-range header values).
    Config(ConfigError),
    /// Underlying I/O error (socket bind, send/recv, etc.).
    Io(io::Error),
}

/// Reasons a received datagram is not answered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProtocolError {
    /// Request packet too short (< 48 bytes).
    RequestTooShort {
        /// Number of bytes received.
        received: usize,
    },
    /// Header decoded but has out-of-range fields.
    InvalidRequest(ValidationError),
    /// Request is not in client mode.
    UnexpectedMode {
        /// The mode value received.
        mode: u8,
    },
}

/// Server configuration errors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Invalid listen address.
    InvalidListenAddress {
        /// The address that was invalid.
        address: String,
        /// Detail about why it is invalid.
        detail: String,
    },
    /// A network in an allow or deny list did not parse.
    InvalidNetwork {
        /// The text that failed to parse.
        network: String,
        /// Detail about why it is invalid.
        detail: String,
    },
    /// Stratum outside 1-15.
    InvalidStratum {
        /// The configured stratum.
        stratum: u8,
    },
    /// Poll exponent outside 4-17.
    InvalidPoll {
        /// The configured poll exponent.
        poll: i8,
    },
    /// Precision exponent above zero.
    InvalidPrecision {
        /// The configured precision exponent.
        precision: i8,
    },
    /// Zero worker tasks requested.
    NoWorkers,
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for NtpServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NtpServerError::Protocol(e) => write!(f, "NTP server protocol error: {e}"),
            NtpServerError::Config(e) => write!(f, "NTP server config error: {e}"),
            NtpServerError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::RequestTooShort { received } => {
                write!(f, "NTP request too short ({received} bytes)")
            }
            ProtocolError::InvalidRequest(e) => write!(f, "{e}"),
            ProtocolError::UnexpectedMode { mode } => {
                write!(f, "unexpected request mode: {mode}")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidListenAddress { address, detail } => {
                write!(f, "invalid listen address '{address}': {detail}")
            }
            ConfigError::InvalidNetwork { network, detail } => {
                write!(f, "invalid network '{network}': {detail}")
            }
            ConfigError::InvalidStratum { stratum } => {
                write!(f, "stratum {stratum} out of range 1-15")
            }
            ConfigError::InvalidPoll { poll } => write!(f, "poll {poll} out of range 4-17"),
            ConfigError::InvalidPrecision { precision } => {
                write!(f, "precision {precision} must not be positive")
            }
            ConfigError::NoWorkers => write!(f, "at least one worker is required"),
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for NtpServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NtpServerError::Io(e) => Some(e),
            NtpServerError::Protocol(e) => Some(e),
            NtpServerError::Config(e) => Some(e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::InvalidRequest(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}

// ── From conversions ────────────────────────────────────────────────

impl From<NtpServerError> for io::Error {
    fn from(err: NtpServerError) -> io::Error {
        let kind = match &err {
            NtpServerError::Protocol(_) => io::ErrorKind::InvalidData,
            NtpServerError::Config(_) => io::ErrorKind::InvalidInput,
            NtpServerError::Io(e) => e.kind(),
        };
        // Preserve the original io::Error directly for the Io variant.
        if let NtpServerError::Io(e) = err {
            return e;
        }
        io::Error::new(kind, err)
    }
}

impl From<io::Error> for NtpServerError {
    fn from(err: io::Error) -> NtpServerError {
        NtpServerError::Io(err)
    }
}

impl From<ProtocolError> for NtpServerError {
    fn from(err: ProtocolError) -> NtpServerError {
        NtpServerError::Protocol(err)
    }
}

impl From<ConfigError> for NtpServerError {
    fn from(err: ConfigError) -> NtpServerError {
        NtpServerError::Config(err)
    }
}

impl From<ConfigError> for io::Error {
    fn from(err: ConfigError) -> io::Error {
        NtpServerError::Config(err).into()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
