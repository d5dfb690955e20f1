// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

// Benchmarks for NTP packet parsing, validation, and serialization.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use ntp_proto::protocol::{
    self, ConstPackedSizeBytes, FromBytes, LeapIndicator, Mode, Packet, ReferenceId, ShortFormat,
    Stratum, TimestampFormat, ToBytes, Version,
};
use ntp_proto::unix_time::Instant;

fn make_test_packet() -> Packet {
    Packet {
        leap_indicator: LeapIndicator::NoWarning,
        version: Version::V4,
        mode: Mode::Server,
        stratum: Stratum::PRIMARY,
        poll: 6,
        precision: -20,
        root_delay: ShortFormat {
            seconds: 0,
            fraction: 256,
        },
        root_dispersion: ShortFormat {
            seconds: 0,
            fraction: 512,
        },
        reference_id: ReferenceId::from_ascii("GPS"),
        reference_timestamp: TimestampFormat {
            seconds: 3_913_056_000,
            fraction: 0xABCD_1234,
        },
        origin_timestamp: TimestampFormat {
            seconds: 3_913_056_001,
            fraction: 0x1111_2222,
        },
        receive_timestamp: TimestampFormat {
            seconds: 3_913_056_002,
            fraction: 0x3333_4444,
        },
        transmit_timestamp: TimestampFormat {
            seconds: 3_913_056_003,
            fraction: 0x5555_6666,
        },
    }
}

fn bench_packet_from_bytes(c: &mut Criterion) {
    let buf = protocol::serialize(&make_test_packet());

    c.bench_function("packet_from_bytes", |b| {
        b.iter(|| Packet::from_bytes(black_box(&buf)).unwrap())
    });
}

fn bench_packet_to_bytes(c: &mut Criterion) {
    let pkt = make_test_packet();
    let mut buf = [0u8; Packet::PACKED_SIZE_BYTES];

    c.bench_function("packet_to_bytes", |b| {
        b.iter(|| black_box(&pkt).to_bytes(&mut buf).unwrap())
    });
}

fn bench_serialize(c: &mut Criterion) {
    let pkt = make_test_packet();

    c.bench_function("packet_serialize", |b| {
        b.iter(|| protocol::serialize(black_box(&pkt)))
    });
}

fn bench_parse_and_validate(c: &mut Criterion) {
    let buf = protocol::serialize(&make_test_packet());

    c.bench_function("packet_parse_validate_classify", |b| {
        b.iter(|| {
            let p = protocol::parse(black_box(&buf)).unwrap();
            (p.is_valid(), p.classify())
        })
    });
}

fn bench_timestamp_from_instant(c: &mut Criterion) {
    let instant = Instant::new(1_704_067_200, 123_456_789);

    c.bench_function("timestamp_from_instant", |b| {
        b.iter(|| TimestampFormat::from_instant(black_box(instant)))
    });
}

criterion_group!(
    benches,
    bench_packet_from_bytes,
    bench_packet_to_bytes,
    bench_serialize,
    bench_parse_and_validate,
    bench_timestamp_from_instant,
);
criterion_main!(benches);
