// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! NTPv4 server library on the tokio runtime.
//!
//! [`server_common`] holds the per-datagram logic (validation, response
//! building, access control, rate limiting, metrics) as plain functions over
//! borrowed state; [`server`] drives it from a UDP socket with a pool of
//! worker tasks. All server timestamps come from a [`clock::Clock`].

#![warn(missing_docs)]

// Re-export protocol types from ntp_proto for convenience.
pub use ntp_proto::{exchange, protocol, unix_time};

/// Custom error types for the server.
pub mod error;

/// Time sources for server timestamps.
pub mod clock;

/// Shared types and logic for the NTP server.
///
/// Provides request validation, response building, rate limiting, access control,
/// and metrics per RFC 5905 and RFC 8633.
pub mod server_common;

/// NTP server using the Tokio runtime.
///
/// Provides a configurable NTPv4 server that responds to client requests.
pub mod server;
