// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use std::time;

use crate::protocol;

/// The number of seconds from 1st January 1900 UTC to the start of the Unix epoch.
pub const EPOCH_DELTA: i64 = 2_208_988_800;

/// The number of seconds in one NTP era (2^32 seconds, approximately 136 years).
///
/// Era 0 spans from 1900-01-01 00:00:00 UTC to 2036-02-07 06:28:15 UTC.
/// Era 1 begins at 2036-02-07 06:28:16 UTC.
pub const ERA_SECONDS: i64 = 1 << 32;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Describes an instant relative to the `UNIX_EPOCH` - 00:00:00 Coordinated Universal Time (UTC),
/// Thursday, 1 January 1970 in seconds with the fractional part in nanoseconds.
///
/// If the **Instant** describes some moment prior to `UNIX_EPOCH`, both the `secs` and
/// `subsec_nanos` components will be negative.
///
/// The sole purpose of this type is for retrieving the "current" time using the `std::time` module
/// and for converting to and from the NTP timestamp format.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Instant {
    secs: i64,
    subsec_nanos: i32,
}

impl Instant {
    /// Create a new **Instant** given its `secs` and `subsec_nanos` components.
    ///
    /// To indicate a time following `UNIX_EPOCH`, both `secs` and `subsec_nanos` must be positive.
    /// To indicate a time prior to `UNIX_EPOCH`, both `secs` and `subsec_nanos` must be negative.
    /// Violating these invariants will result in a **panic!**.
    pub fn new(secs: i64, subsec_nanos: i32) -> Instant {
        if secs > 0 && subsec_nanos < 0 {
            panic!("invalid instant: secs was positive but subsec_nanos was negative");
        }
        if secs < 0 && subsec_nanos > 0 {
            panic!("invalid instant: secs was negative but subsec_nanos was positive");
        }
        Instant { secs, subsec_nanos }
    }

    /// Build an **Instant** from a signed count of nanoseconds since `UNIX_EPOCH`.
    pub fn from_total_nanos(nanos: i128) -> Instant {
        // Truncating division keeps both components on the same side of zero.
        let secs = (nanos / NANOS_PER_SEC as i128) as i64;
        let subsec_nanos = (nanos % NANOS_PER_SEC as i128) as i32;
        Instant { secs, subsec_nanos }
    }

    /// Uses `std::time::SystemTime::now` and `std::time::UNIX_EPOCH` to determine the current
    /// **Instant**.
    ///
    /// ## Example
    ///
    /// ```
    /// println!("{:?}", ntp_proto::unix_time::Instant::now());
    /// ```
    pub fn now() -> Self {
        time::SystemTime::now().into()
    }

    /// The "seconds" component of the **Instant**.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// The fractional component of the **Instant** in nanoseconds.
    pub fn subsec_nanos(&self) -> i32 {
        self.subsec_nanos
    }

    /// Signed nanoseconds since `UNIX_EPOCH`.
    pub fn total_nanos(&self) -> i128 {
        self.secs as i128 * NANOS_PER_SEC as i128 + self.subsec_nanos as i128
    }

    /// Signed nanoseconds elapsed from `earlier` to `self`. Negative when `earlier` is later.
    pub fn nanos_since(&self, earlier: &Instant) -> i128 {
        self.total_nanos() - earlier.total_nanos()
    }
}

impl From<time::SystemTime> for Instant {
    fn from(t: time::SystemTime) -> Self {
        match t.duration_since(time::UNIX_EPOCH) {
            Ok(duration) => {
                let secs = duration.as_secs() as i64;
                let subsec_nanos = duration.subsec_nanos() as i32;
                Instant::new(secs, subsec_nanos)
            }
            Err(sys_time_err) => {
                let duration_pre_unix_epoch = sys_time_err.duration();
                let secs = -(duration_pre_unix_epoch.as_secs() as i64);
                let subsec_nanos = -(duration_pre_unix_epoch.subsec_nanos() as i32);
                Instant::new(secs, subsec_nanos)
            }
        }
    }
}

// Fraction arithmetic. Both directions stay in 64-bit integers: a 32-bit fraction times 10^9
// does not fit in 32 bits.

/// `round(nanos * 2^32 / 10^9)` for `nanos` in `0..10^9`. May return exactly 2^32.
fn nanos_to_fraction(nanos: u64) -> u64 {
    ((nanos << 32) + NANOS_PER_SEC as u64 / 2) / NANOS_PER_SEC as u64
}

/// `fraction * 10^9 / 2^32`, truncating.
fn fraction_to_nanos(fraction: u32) -> i64 {
    ((fraction as u64 * NANOS_PER_SEC as u64) >> 32) as i64
}

impl protocol::TimestampFormat {
    /// Convert a Unix [`Instant`] to an NTP timestamp.
    ///
    /// The seconds field is `secs + EPOCH_DELTA` truncated to 32 bits, which drops the era.
    /// The fraction is rounded to the nearest 2^-32 s; a rounding carry moves into the seconds.
    pub fn from_instant(instant: Instant) -> Self {
        let mut secs = instant.secs + EPOCH_DELTA;
        let mut nanos = instant.subsec_nanos as i64;
        if nanos < 0 {
            secs -= 1;
            nanos += NANOS_PER_SEC;
        }
        let mut fraction = nanos_to_fraction(nanos as u64);
        if fraction > u32::MAX as u64 {
            secs += 1;
            fraction = 0;
        }
        protocol::TimestampFormat {
            seconds: secs as u32,
            fraction: fraction as u32,
        }
    }

    /// Convert an NTP timestamp to a Unix [`Instant`], assuming NTP era 0.
    ///
    /// Timestamps before 1970 give negative instants. The fraction is truncated to whole
    /// nanoseconds. Use [`timestamp_to_instant`] when the timestamp may lie in another era.
    pub fn to_instant(&self) -> Instant {
        let secs = self.seconds as i64 - EPOCH_DELTA;
        Instant::from_total_nanos(
            secs as i128 * NANOS_PER_SEC as i128 + fraction_to_nanos(self.fraction) as i128,
        )
    }

    /// The current wall-clock time as an NTP timestamp.
    pub fn now() -> Self {
        Self::from_instant(Instant::now())
    }
}

impl From<Instant> for protocol::TimestampFormat {
    fn from(t: Instant) -> Self {
        protocol::TimestampFormat::from_instant(t)
    }
}

impl From<protocol::TimestampFormat> for Instant {
    /// Era 0 conversion; see [`protocol::TimestampFormat::to_instant`].
    fn from(t: protocol::TimestampFormat) -> Self {
        t.to_instant()
    }
}

// Era-aware conversion helpers.

/// Given a raw 32-bit NTP timestamp seconds value and a pivot `Instant`,
/// return the absolute NTP seconds (i64) by selecting the era closest to the pivot.
///
/// The algorithm assumes the timestamp is within half an era (~68 years) of the pivot.
fn era_aware_ntp_seconds(raw_seconds: u32, pivot: &Instant) -> i64 {
    let pivot_ntp = pivot.secs + EPOCH_DELTA;
    let raw = raw_seconds as i64;

    let pivot_era = pivot_ntp.div_euclid(ERA_SECONDS);
    let candidate = pivot_era * ERA_SECONDS + raw;

    let diff = candidate - pivot_ntp;
    if diff > ERA_SECONDS / 2 {
        candidate - ERA_SECONDS
    } else if diff < -(ERA_SECONDS / 2) {
        candidate + ERA_SECONDS
    } else {
        candidate
    }
}

/// Convert a [`protocol::TimestampFormat`] to an [`Instant`] using the given pivot
/// for era disambiguation.
///
/// The 32-bit NTP timestamp format is ambiguous across eras (each era spans ~136 years).
/// This function resolves the ambiguity by selecting the era that places the timestamp
/// closest to the provided pivot (within ~68 years).
///
/// For live NTP usage, pass `Instant::now()` as the pivot.
pub fn timestamp_to_instant(ts: protocol::TimestampFormat, pivot: &Instant) -> Instant {
    let ntp_secs = era_aware_ntp_seconds(ts.seconds, pivot);
    let secs = ntp_secs - EPOCH_DELTA;
    Instant::from_total_nanos(
        secs as i128 * NANOS_PER_SEC as i128 + fraction_to_nanos(ts.fraction) as i128,
    )
}
