// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Round-trip delay and clock offset from the four timestamps of one exchange.
//!
//! ```text
//!   t1 = client transmit      (request origin timestamp)
//!   t2 = server receive       (response receive timestamp)
//!   t3 = server transmit      (response transmit timestamp)
//!   t4 = client receive       (destination timestamp)
//!
//!   delay  = (t4 - t1) - (t3 - t2)
//!   offset = ((t2 - t1) + (t3 - t4)) / 2
//! ```
//!
//! Differences are taken on the 64-bit fixed-point values with wrapping
//! subtraction (RFC 5905 Appendix A.5.2), so an exchange straddling the 2036
//! rollover still yields the right answer. Arithmetic is done in signed integer
//! nanoseconds and only the final result becomes `f64` seconds.

use crate::protocol::TimestampFormat;

/// Signed nanoseconds from `earlier` to `later`, assuming they are within 68 years.
fn nanos_between(earlier: TimestampFormat, later: TimestampFormat) -> i64 {
    let diff = later.to_bits().wrapping_sub(earlier.to_bits()) as i64;
    ((diff as i128 * 1_000_000_000) >> 32) as i64
}

fn nanos_to_secs(nanos: i64) -> f64 {
    nanos as f64 / 1e9
}

/// Round-trip delay in seconds: `(t4 - t1) - (t3 - t2)`.
pub fn round_trip_delay(
    t1: TimestampFormat,
    t2: TimestampFormat,
    t3: TimestampFormat,
    t4: TimestampFormat,
) -> f64 {
    nanos_to_secs(nanos_between(t1, t4) - nanos_between(t2, t3))
}

/// Clock offset of the server relative to the client in seconds:
/// `((t2 - t1) + (t3 - t4)) / 2`.
pub fn clock_offset(
    t1: TimestampFormat,
    t2: TimestampFormat,
    t3: TimestampFormat,
    t4: TimestampFormat,
) -> f64 {
    nanos_to_secs((nanos_between(t1, t2) + nanos_between(t4, t3)) / 2)
}

/// Both results of one exchange as `(offset, delay)` in seconds.
pub fn offset_delay(
    t1: TimestampFormat,
    t2: TimestampFormat,
    t3: TimestampFormat,
    t4: TimestampFormat,
) -> (f64, f64) {
    (
        clock_offset(t1, t2, t3, t4),
        round_trip_delay(t1, t2, t3, t4),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(seconds: u32, millis: u32) -> TimestampFormat {
        TimestampFormat {
            seconds,
            fraction: ((millis as u64) << 32).div_ceil(1000) as u32,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn symmetric_path_zero_offset() {
        // 10 ms each way, 5 ms processing.
        let t1 = ts(1000, 0);
        let t2 = ts(1000, 10);
        let t3 = ts(1000, 15);
        let t4 = ts(1000, 25);
        assert!(approx(round_trip_delay(t1, t2, t3, t4), 0.020));
        assert!(approx(clock_offset(t1, t2, t3, t4), 0.0));
    }

    #[test]
    fn server_ahead_by_one_second() {
        let t1 = ts(1000, 0);
        let t2 = ts(1001, 10);
        let t3 = ts(1001, 15);
        let t4 = ts(1000, 25);
        let (offset, delay) = offset_delay(t1, t2, t3, t4);
        assert!(approx(offset, 1.0));
        assert!(approx(delay, 0.020));
    }

    #[test]
    fn server_behind_gives_negative_offset() {
        let t1 = ts(1000, 500);
        let t2 = ts(998, 510);
        let t3 = ts(998, 520);
        let t4 = ts(1000, 530);
        assert!(approx(clock_offset(t1, t2, t3, t4), -2.0));
        assert!(approx(round_trip_delay(t1, t2, t3, t4), 0.020));
    }

    #[test]
    fn exchange_across_era_rollover() {
        let t1 = ts(u32::MAX, 990);
        let t2 = ts(0, 0);
        let t3 = ts(0, 0);
        let t4 = ts(0, 10);
        assert!(approx(round_trip_delay(t1, t2, t3, t4), 0.020));
        assert!(approx(clock_offset(t1, t2, t3, t4), 0.0));
    }
}
