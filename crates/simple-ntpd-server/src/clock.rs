// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Time sources for server timestamps.
//!
//! Every timestamp the server writes (reference, receive, transmit) comes from a
//! [`Clock`], so tests can pin the values a response carries.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::TimestampFormat;

/// A source of NTP timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current time.
    fn now(&self) -> TimestampFormat;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampFormat {
        TimestampFormat::now()
    }
}

/// A clock that only moves when told to.
///
/// Each call to [`Clock::now`] returns the current setting and then advances it by
/// the configured step, so successive reads are distinct and ordered.
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
    step: u64,
}

impl ManualClock {
    /// A clock frozen at `start`.
    pub fn new(start: TimestampFormat) -> Self {
        ManualClock {
            bits: AtomicU64::new(start.to_bits()),
            step: 0,
        }
    }

    /// A clock starting at `start` that advances by `step_fraction` units of
    /// 2^-32 s after every read.
    pub fn stepping(start: TimestampFormat, step_fraction: u32) -> Self {
        ManualClock {
            bits: AtomicU64::new(start.to_bits()),
            step: step_fraction as u64,
        }
    }

    /// Jump to `ts`.
    pub fn set(&self, ts: TimestampFormat) {
        self.bits.store(ts.to_bits(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampFormat {
        TimestampFormat::from_bits(self.bits.fetch_add(self.step, Ordering::SeqCst))
    }
}
