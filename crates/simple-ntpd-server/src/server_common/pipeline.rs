// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::ProtocolError;
use crate::protocol::{self, ConstPackedSizeBytes, KissOfDeath};

use super::{
    AccessControl, ClientTable, RateLimitConfig, RateLimitResult, ServerMetrics,
    ServerSystemState, build_kod_response, build_server_response,
    serialize_response, validate_client_request,
};

/// Why a datagram was not answered.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DropReason {
    /// Shorter than the 48-byte header.
    TooShort,
    /// Header fields out of range.
    Invalid,
    /// A well-formed packet that is not a client request.
    NotClientRequest,
}

/// The complete result of handling one datagram.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandleResult {
    /// Send this response buffer to the client.
    Response([u8; protocol::Packet::PACKED_SIZE_BYTES]),
    /// Send nothing.
    Drop(DropReason),
}

/// Everything the pipeline reads or updates besides the datagram itself.
#[derive(Clone, Copy, Debug)]
pub struct RequestContext<'a> {
    /// System variables copied into responses.
    pub state: &'a ServerSystemState,
    /// Allow and deny lists.
    pub access_control: &'a AccessControl,
    /// Rate limiting, if enabled.
    pub rate_limit: Option<&'a RateLimitConfig>,
    /// Per-client rate limit state.
    pub client_table: &'a Mutex<ClientTable>,
    /// Source of the transmit timestamp.
    pub clock: &'a dyn Clock,
    /// Counters to update, if any.
    pub metrics: Option<&'a ServerMetrics>,
}

/// Handle a single received datagram (pure logic, no I/O).
///
/// `t2` is the receive timestamp, captured by the caller as soon as the datagram
/// arrived. The returned response, if any, already carries its transmit
/// timestamp.
pub fn handle_request(
    recv_buf: &[u8],
    src_ip: IpAddr,
    t2: protocol::TimestampFormat,
    ctx: &RequestContext<'_>,
) -> HandleResult {
    if let Some(m) = ctx.metrics {
        m.inc_requests_received();
    }

    // 1. Parse, validate, classify.
    let request = match validate_client_request(recv_buf) {
        Ok(req) => req,
        Err(e) => return drop_request(ctx, src_ip, e),
    };

    // 2. Access control.
    if let Some(kod) = ctx.access_control.check(&src_ip).kiss_code() {
        debug!(client = %src_ip, code = %kod, "refusing client");
        return kiss_of_death(ctx, &request, kod);
    }

    // 3. Rate limiting.
    if let Some(config) = ctx.rate_limit {
        let now = Instant::now();
        let mut table = ctx.client_table.lock().unwrap_or_else(|e| e.into_inner());
        let result = table.admit(src_ip, now, config);
        if let Some(m) = ctx.metrics {
            m.set_active_clients(table.len() as u64);
        }
        drop(table);
        if result == RateLimitResult::RateExceeded {
            debug!(client = %src_ip, "rate limit exceeded");
            return kiss_of_death(ctx, &request, KissOfDeath::Rate);
        }
    }

    // 4. Build and serialize; T3 is taken inside serialize_response.
    let response = build_server_response(&request, ctx.state, t2);
    HandleResult::Response(serialize_response(&response, ctx.clock))
}

fn drop_request(ctx: &RequestContext<'_>, src_ip: IpAddr, err: ProtocolError) -> HandleResult {
    let reason = match &err {
        ProtocolError::RequestTooShort { .. } => {
            warn!(client = %src_ip, error = %err, "dropping datagram");
            DropReason::TooShort
        }
        ProtocolError::InvalidRequest(_) => {
            warn!(client = %src_ip, error = %err, "dropping datagram");
            DropReason::Invalid
        }
        ProtocolError::UnexpectedMode { .. } => {
            debug!(client = %src_ip, error = %err, "ignoring non-client packet");
            DropReason::NotClientRequest
        }
    };
    if let Some(m) = ctx.metrics {
        m.inc_dropped(reason);
    }
    HandleResult::Drop(reason)
}

fn kiss_of_death(
    ctx: &RequestContext<'_>,
    request: &protocol::Packet,
    kod: KissOfDeath,
) -> HandleResult {
    if let Some(m) = ctx.metrics {
        m.inc_kod(kod);
    }
    let response = build_kod_response(request, kod);
    HandleResult::Response(serialize_response(&response, ctx.clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::protocol::{Mode, Packet, Stratum, TimestampFormat};
    use crate::server_common::IpNet;
    use std::time::Duration;

    const T1: TimestampFormat = TimestampFormat {
        seconds: 3_913_056_000,
        fraction: 12345,
    };
    const T2: TimestampFormat = TimestampFormat {
        seconds: 3_913_056_000,
        fraction: 0x4000_0000,
    };
    const T3: TimestampFormat = TimestampFormat {
        seconds: 3_913_056_000,
        fraction: 0x4000_1000,
    };

    struct Fixture {
        state: ServerSystemState,
        access_control: AccessControl,
        rate_limit: Option<RateLimitConfig>,
        client_table: Mutex<ClientTable>,
        clock: ManualClock,
        metrics: ServerMetrics,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                state: ServerSystemState::default(),
                access_control: AccessControl::default(),
                rate_limit: None,
                client_table: Mutex::new(ClientTable::new(16)),
                clock: ManualClock::new(T3),
                metrics: ServerMetrics::new(),
            }
        }

        fn handle(&self, buf: &[u8], src: &str) -> HandleResult {
            let ctx = RequestContext {
                state: &self.state,
                access_control: &self.access_control,
                rate_limit: self.rate_limit.as_ref(),
                client_table: &self.client_table,
                clock: &self.clock,
                metrics: Some(&self.metrics),
            };
            handle_request(buf, src.parse().unwrap(), T2, &ctx)
        }
    }

    fn client_request() -> [u8; 48] {
        protocol::serialize(&Packet {
            transmit_timestamp: T1,
            ..Packet::default()
        })
    }

    fn expect_response(result: HandleResult) -> Packet {
        match result {
            HandleResult::Response(buf) => protocol::parse(&buf).unwrap(),
            HandleResult::Drop(reason) => panic!("expected response, dropped: {reason:?}"),
        }
    }

    #[test]
    fn answers_client_request() {
        let fx = Fixture::new();
        let resp = expect_response(fx.handle(&client_request(), "192.0.2.1"));
        assert_eq!(resp.mode, Mode::Server);
        assert_eq!(resp.stratum, Stratum(2));
        assert_eq!(resp.origin_timestamp, T1);
        assert_eq!(resp.receive_timestamp, T2);
        assert_eq!(resp.transmit_timestamp, T3);
        assert_eq!(resp.reference_id.as_bytes(), *b"LOCL");

        let snap = fx.metrics.snapshot();
        assert_eq!(snap.requests_received, 1);
        assert_eq!(snap.requests_dropped, 0);
    }

    #[test]
    fn drops_short_datagram() {
        let fx = Fixture::new();
        let result = fx.handle(&client_request()[..20], "192.0.2.1");
        assert_eq!(result, HandleResult::Drop(DropReason::TooShort));
        assert_eq!(fx.metrics.snapshot().dropped_too_short, 1);
    }

    #[test]
    fn drops_invalid_header() {
        let fx = Fixture::new();
        let mut buf = client_request();
        buf[1] = 16; // stratum
        assert_eq!(
            fx.handle(&buf, "192.0.2.1"),
            HandleResult::Drop(DropReason::Invalid)
        );
        assert_eq!(fx.metrics.snapshot().dropped_invalid, 1);
    }

    #[test]
    fn drops_server_response() {
        let fx = Fixture::new();
        let mut buf = client_request();
        buf[0] = 0x24; // LI=0, VN=4, Mode=4
        assert_eq!(
            fx.handle(&buf, "192.0.2.1"),
            HandleResult::Drop(DropReason::NotClientRequest)
        );
        assert_eq!(fx.metrics.snapshot().dropped_not_client, 1);
    }

    #[test]
    fn deny_list_gets_kod_deny() {
        let mut fx = Fixture::new();
        fx.access_control = AccessControl::new(None, Some(vec!["192.0.2.0/24".parse().unwrap()]));
        let resp = expect_response(fx.handle(&client_request(), "192.0.2.1"));
        assert_eq!(resp.stratum, Stratum::UNSPECIFIED);
        assert_eq!(resp.reference_id.as_bytes(), *b"DENY");
        assert_eq!(resp.origin_timestamp, T1);
        assert_eq!(fx.metrics.snapshot().kod_deny_sent, 1);

        let resp = expect_response(fx.handle(&client_request(), "198.51.100.1"));
        assert_eq!(resp.stratum, Stratum(2));
    }

    #[test]
    fn allow_list_gets_kod_rstr() {
        let mut fx = Fixture::new();
        let allow: IpNet = "10.0.0.0/8".parse().unwrap();
        fx.access_control = AccessControl::new(Some(vec![allow]), None);
        let resp = expect_response(fx.handle(&client_request(), "192.0.2.1"));
        assert_eq!(resp.reference_id.as_bytes(), *b"RSTR");
        assert_eq!(fx.metrics.snapshot().kod_rstr_sent, 1);
    }

    #[test]
    fn rate_limit_gets_kod_rate() {
        let mut fx = Fixture::new();
        fx.rate_limit = Some(RateLimitConfig {
            max_requests_per_window: 5,
            window_duration: Duration::from_secs(60),
            min_interval: Duration::from_secs(60),
        });
        let first = expect_response(fx.handle(&client_request(), "192.0.2.1"));
        assert_eq!(first.stratum, Stratum(2));
        let second = expect_response(fx.handle(&client_request(), "192.0.2.1"));
        assert_eq!(second.reference_id.as_bytes(), *b"RATE");
        // Another client is unaffected.
        let other = expect_response(fx.handle(&client_request(), "192.0.2.2"));
        assert_eq!(other.stratum, Stratum(2));

        let snap = fx.metrics.snapshot();
        assert_eq!(snap.kod_rate_sent, 1);
        assert_eq!(snap.active_clients, 2);
    }

    #[test]
    fn handles_without_metrics() {
        let fx = Fixture::new();
        let ctx = RequestContext {
            state: &fx.state,
            access_control: &fx.access_control,
            rate_limit: None,
            client_table: &fx.client_table,
            clock: &fx.clock,
            metrics: None,
        };
        let result = handle_request(&client_request(), "::1".parse().unwrap(), T2, &ctx);
        assert!(matches!(result, HandleResult::Response(_)));
    }
}
