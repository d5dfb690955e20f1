// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Lock-free server metrics using atomic counters.
//!
//! All counters use relaxed ordering; a snapshot taken while workers are running
//! is approximate.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::KissOfDeath;

use super::DropReason;

/// Runtime server metrics, updated atomically on every datagram.
///
/// Create an instance with [`ServerMetrics::new()`], wrap in `Arc`, and pass
/// to [`NtpServerBuilder::metrics()`](crate::server::NtpServerBuilder::metrics).
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> std::io::Result<()> {
/// use std::sync::Arc;
/// use ntp_server::server::NtpServer;
/// use ntp_server::server_common::ServerMetrics;
///
/// let metrics = Arc::new(ServerMetrics::new());
/// let server = NtpServer::builder()
///     .listen("127.0.0.1:1234")
///     .metrics(metrics.clone())
///     .build()
///     .await?;
///
/// // Read metrics from another task
/// let snap = metrics.snapshot();
/// println!("requests: {}", snap.requests_received);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Datagrams handed to the request pipeline.
    pub requests_received: AtomicU64,
    /// Responses (normal and KoD) written to the socket.
    pub responses_sent: AtomicU64,
    /// Datagrams dropped without an answer, for any reason.
    pub requests_dropped: AtomicU64,
    /// Datagrams shorter than an NTP header.
    pub dropped_too_short: AtomicU64,
    /// Datagrams with out-of-range header fields.
    pub dropped_invalid: AtomicU64,
    /// Valid packets that were not client requests.
    pub dropped_not_client: AtomicU64,
    /// KoD DENY responses built (access denied).
    pub kod_deny_sent: AtomicU64,
    /// KoD RSTR responses built (access restricted).
    pub kod_rstr_sent: AtomicU64,
    /// KoD RATE responses built (rate limited).
    pub kod_rate_sent: AtomicU64,
    /// Payload bytes received.
    pub bytes_received: AtomicU64,
    /// Payload bytes sent.
    pub bytes_sent: AtomicU64,
    /// Failed socket sends.
    pub send_errors: AtomicU64,
    /// Current number of tracked clients in the rate limit table.
    pub active_clients: AtomicU64,
}

impl ServerMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a point-in-time snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            requests_dropped: self.requests_dropped.load(Ordering::Relaxed),
            dropped_too_short: self.dropped_too_short.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            dropped_not_client: self.dropped_not_client.load(Ordering::Relaxed),
            kod_deny_sent: self.kod_deny_sent.load(Ordering::Relaxed),
            kod_rstr_sent: self.kod_rstr_sent.load(Ordering::Relaxed),
            kod_rate_sent: self.kod_rate_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            active_clients: self.active_clients.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn inc_requests_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_response_sent(&self, bytes: usize) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_bytes_received(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_send_errors(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_dropped(&self, reason: DropReason) {
        self.requests_dropped.fetch_add(1, Ordering::Relaxed);
        let counter = match reason {
            DropReason::TooShort => &self.dropped_too_short,
            DropReason::Invalid => &self.dropped_invalid,
            DropReason::NotClientRequest => &self.dropped_not_client,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_kod(&self, kod: KissOfDeath) {
        let counter = match kod {
            KissOfDeath::Deny => &self.kod_deny_sent,
            KissOfDeath::Rstr => &self.kod_rstr_sent,
            KissOfDeath::Rate => &self.kod_rate_sent,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set_active_clients(&self, count: u64) {
        self.active_clients.store(count, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of server metrics (non-atomic, copyable).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MetricsSnapshot {
    /// Datagrams handed to the request pipeline.
    pub requests_received: u64,
    /// Responses (normal and KoD) written to the socket.
    pub responses_sent: u64,
    /// Datagrams dropped without an answer.
    pub requests_dropped: u64,
    /// Datagrams shorter than an NTP header.
    pub dropped_too_short: u64,
    /// Datagrams with out-of-range header fields.
    pub dropped_invalid: u64,
    /// Valid packets that were not client requests.
    pub dropped_not_client: u64,
    /// KoD DENY responses built.
    pub kod_deny_sent: u64,
    /// KoD RSTR responses built.
    pub kod_rstr_sent: u64,
    /// KoD RATE responses built.
    pub kod_rate_sent: u64,
    /// Payload bytes received.
    pub bytes_received: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Failed socket sends.
    pub send_errors: u64,
    /// Current number of tracked clients.
    pub active_clients: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} sent={} dropped={} (short={} invalid={} not_client={}) \
             kod(deny={} rstr={} rate={}) bytes(in={} out={}) send_errors={} clients={}",
            self.requests_received,
            self.responses_sent,
            self.requests_dropped,
            self.dropped_too_short,
            self.dropped_invalid,
            self.dropped_not_client,
            self.kod_deny_sent,
            self.kod_rstr_sent,
            self.kod_rate_sent,
            self.bytes_received,
            self.bytes_sent,
            self.send_errors,
            self.active_clients,
        )
    }
}
