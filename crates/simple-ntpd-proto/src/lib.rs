// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! NTPv4 timestamp and packet codec.
//!
//! This crate provides the wire types and parsing logic a Network Time Protocol
//! (RFC 5905) server needs: the 48-byte header, the 32.32 fixed-point timestamp
//! and its conversion to and from wall-clock time, header validation and
//! classification, and the delay/offset arithmetic of one exchange. It performs
//! no I/O.

#![warn(missing_docs)]

/// Custom error types for buffer-based NTP packet parsing and validation.
pub mod error;

/// Round-trip delay and clock offset computation.
pub mod exchange;

/// NTP protocol types and constants (RFC 5905).
pub mod protocol;

/// Unix time conversion utilities for NTP timestamps.
pub mod unix_time;
