// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! NTP server using the Tokio runtime.
//!
//! Provides a configurable NTPv4 server that responds to client requests with
//! accurate timestamps per RFC 5905. Supports rate limiting (RFC 8633) and
//! IP-based access control.
//!
//! # Architecture
//!
//! The server binds one UDP socket and runs a fixed number of worker tasks that
//! share it. Each worker receives a datagram, stamps T2, runs the synchronous
//! request pipeline, and sends the response. Workers stop when the shutdown
//! future passed to [`NtpServer::run_until`] completes.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> std::io::Result<()> {
//! use ntp_server::server::NtpServer;
//!
//! let server = NtpServer::builder()
//!     .listen("0.0.0.0:123")
//!     .stratum(ntp_server::protocol::Stratum(2))
//!     .build()
//!     .await?;
//!
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
use crate::protocol;
use crate::server_common::{
    AccessControl, ClientTable, HandleResult, IpNet, RateLimitConfig, RequestContext,
    ServerMetrics, ServerSystemState, handle_request,
};

/// Listen address used when none is configured.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:123";

/// Worker task count used when none is configured.
pub const DEFAULT_WORKERS: usize = 4;

/// Client table capacity used when none is configured.
pub const DEFAULT_MAX_CLIENTS: usize = 100_000;

// Large enough for a header plus extension fields; anything past 48 bytes is ignored.
const RECV_BUF_SIZE: usize = 2048;

/// Builder for configuring and creating an [`NtpServer`].
#[derive(Debug)]
pub struct NtpServerBuilder {
    listen_addr: String,
    system_state: ServerSystemState,
    allow_list: Option<Vec<IpNet>>,
    deny_list: Option<Vec<IpNet>>,
    rate_limit: Option<RateLimitConfig>,
    max_clients: usize,
    workers: usize,
    metrics: Option<Arc<ServerMetrics>>,
    clock: Arc<dyn Clock>,
}

impl Default for NtpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NtpServerBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        NtpServerBuilder {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            system_state: ServerSystemState::default(),
            allow_list: None,
            deny_list: None,
            rate_limit: None,
            max_clients: DEFAULT_MAX_CLIENTS,
            workers: DEFAULT_WORKERS,
            metrics: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the listen address as `ip:port` (e.g., `"0.0.0.0:123"` or `"[::]:123"`).
    pub fn listen(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Set the stratum level (1-15).
    pub fn stratum(mut self, stratum: protocol::Stratum) -> Self {
        self.system_state.stratum = stratum;
        self
    }

    /// Set the reference identifier. Only the first four bytes are used; shorter
    /// strings are zero-padded.
    pub fn reference_id(mut self, reference_id: &str) -> Self {
        self.system_state.reference_id = protocol::ReferenceId::from_ascii(reference_id);
        self
    }

    /// Set the advertised poll exponent (4-17).
    pub fn poll(mut self, poll: i8) -> Self {
        self.system_state.poll = poll;
        self
    }

    /// Set the advertised precision exponent (at most 0).
    pub fn precision(mut self, precision: i8) -> Self {
        self.system_state.precision = precision;
        self
    }

    /// Set the leap indicator.
    pub fn leap_indicator(mut self, leap: protocol::LeapIndicator) -> Self {
        self.system_state.leap_indicator = leap;
        self
    }

    /// Set the root delay.
    pub fn root_delay(mut self, delay: protocol::ShortFormat) -> Self {
        self.system_state.root_delay = delay;
        self
    }

    /// Set the root dispersion.
    pub fn root_dispersion(mut self, dispersion: protocol::ShortFormat) -> Self {
        self.system_state.root_dispersion = dispersion;
        self
    }

    /// Add a network to the allow list. Once any network is allowed, clients
    /// outside every allowed network receive KoD RSTR.
    pub fn allow(mut self, network: IpNet) -> Self {
        self.allow_list.get_or_insert_with(Vec::new).push(network);
        self
    }

    /// Add a network to the deny list. Matching clients receive KoD DENY.
    pub fn deny(mut self, network: IpNet) -> Self {
        self.deny_list.get_or_insert_with(Vec::new).push(network);
        self
    }

    /// Enable per-client rate limiting.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Set the maximum number of clients tracked for rate limiting.
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the number of worker tasks sharing the socket.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Attach a metrics instance for monitoring.
    pub fn metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the system clock as the source of server timestamps.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validate the configuration and bind the listen address.
    pub async fn build(self) -> io::Result<NtpServer> {
        self.system_state.validate()?;
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers.into());
        }
        let addr: SocketAddr =
            self.listen_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidListenAddress {
                    address: self.listen_addr.clone(),
                    detail: e.to_string(),
                })?;

        let sock = UdpSocket::bind(addr).await?;
        debug!(addr = %addr, "NTP server socket bound");

        Ok(NtpServer {
            sock: Arc::new(sock),
            system_state: Arc::new(RwLock::new(self.system_state)),
            shared: Arc::new(Shared {
                access_control: AccessControl::new(self.allow_list, self.deny_list),
                rate_limit: self.rate_limit,
                client_table: Mutex::new(ClientTable::new(self.max_clients)),
                clock: self.clock,
                metrics: self.metrics,
            }),
            workers: self.workers,
        })
    }
}

/// Read-only configuration and shared mutable state used by every worker.
#[derive(Debug)]
struct Shared {
    access_control: AccessControl,
    rate_limit: Option<RateLimitConfig>,
    client_table: Mutex<ClientTable>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<ServerMetrics>>,
}

/// An NTP server that responds to client requests.
///
/// Created via [`NtpServer::builder()`]. Call [`run_until()`](NtpServer::run_until)
/// to start serving requests.
#[derive(Debug)]
pub struct NtpServer {
    sock: Arc<UdpSocket>,
    system_state: Arc<RwLock<ServerSystemState>>,
    shared: Arc<Shared>,
    workers: usize,
}

impl NtpServer {
    /// Create a builder for configuring the server.
    pub fn builder() -> NtpServerBuilder {
        NtpServerBuilder::new()
    }

    /// Get a reference to the server's system state for external updates.
    ///
    /// Use this to update the server's stratum, reference ID, leap indicator,
    /// etc. Workers read it once per datagram.
    pub fn system_state(&self) -> &Arc<RwLock<ServerSystemState>> {
        &self.system_state
    }

    /// Get the attached metrics instance, if any.
    pub fn metrics(&self) -> Option<&Arc<ServerMetrics>> {
        self.shared.metrics.as_ref()
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Serve requests until the process exits.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve requests until `shutdown` completes, then stop every worker and
    /// return.
    ///
    /// Errors on individual datagrams never end the server; receive and send
    /// failures are logged and the worker moves on.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.local_addr()?;
        let span = info_span!("ntp_server", addr = %addr);

        async move {
            let (stop_tx, stop_rx) = watch::channel(false);
            let mut tasks = JoinSet::new();
            for id in 0..self.workers {
                let worker = Worker {
                    sock: self.sock.clone(),
                    system_state: self.system_state.clone(),
                    shared: self.shared.clone(),
                    shutdown: stop_rx.clone(),
                };
                tasks.spawn(worker.run().instrument(info_span!("worker", id)));
            }
            info!(workers = self.workers, "NTP server started");

            shutdown.await;
            info!("shutdown requested, stopping workers");
            let _ = stop_tx.send(true);

            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "worker task failed");
                }
            }
            info!("NTP server stopped");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

struct Worker {
    sock: Arc<UdpSocket>,
    system_state: Arc<RwLock<ServerSystemState>>,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        let mut recv_buf = [0u8; RECV_BUF_SIZE];
        let metrics = self.shared.metrics.clone();

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            let (recv_len, src_addr) = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                received = self.sock.recv_from(&mut recv_buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        warn!(error = %e, "receive failed");
                        continue;
                    }
                },
            };
            // T2 as early as possible.
            let t2 = self.shared.clock.now();

            if let Some(m) = &metrics {
                m.add_bytes_received(recv_len);
            }

            let state = *self.system_state.read().unwrap_or_else(|e| e.into_inner());
            let ctx = RequestContext {
                state: &state,
                access_control: &self.shared.access_control,
                rate_limit: self.shared.rate_limit.as_ref(),
                client_table: &self.shared.client_table,
                clock: self.shared.clock.as_ref(),
                metrics: metrics.as_deref(),
            };

            match handle_request(&recv_buf[..recv_len], src_addr.ip(), t2, &ctx) {
                HandleResult::Response(resp_buf) => {
                    match self.sock.send_to(&resp_buf, src_addr).await {
                        Ok(sent) => {
                            if let Some(m) = &metrics {
                                m.record_response_sent(sent);
                            }
                        }
                        Err(e) => {
                            warn!(client = %src_addr, error = %e, "send failed");
                            if let Some(m) = &metrics {
                                m.inc_send_errors();
                            }
                        }
                    }
                }
                HandleResult::Drop(reason) => {
                    debug!(client = %src_addr, ?reason, "no response");
                }
            }
        }
        debug!("worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let builder = NtpServer::builder();
        assert_eq!(builder.listen_addr, "0.0.0.0:123");
        assert_eq!(builder.max_clients, 100_000);
        assert_eq!(builder.workers, 4);
        assert!(builder.allow_list.is_none());
        assert!(builder.deny_list.is_none());
        assert!(builder.rate_limit.is_none());
        assert!(builder.metrics.is_none());
        assert_eq!(builder.system_state, ServerSystemState::default());
    }

    #[test]
    fn test_builder_chaining() {
        let builder = NtpServer::builder()
            .listen("[::]:8123")
            .stratum(protocol::Stratum(3))
            .reference_id("GPS")
            .poll(6)
            .precision(-18)
            .leap_indicator(protocol::LeapIndicator::AddOne)
            .root_delay(protocol::ShortFormat {
                seconds: 1,
                fraction: 500,
            })
            .max_clients(10_000)
            .workers(2);

        assert_eq!(builder.listen_addr, "[::]:8123");
        assert_eq!(builder.system_state.stratum, protocol::Stratum(3));
        assert_eq!(builder.system_state.reference_id.as_bytes(), *b"GPS\0");
        assert_eq!(builder.system_state.poll, 6);
        assert_eq!(builder.system_state.precision, -18);
        assert_eq!(
            builder.system_state.leap_indicator,
            protocol::LeapIndicator::AddOne
        );
        assert_eq!(builder.system_state.root_delay.seconds, 1);
        assert_eq!(builder.max_clients, 10_000);
        assert_eq!(builder.workers, 2);
    }

    #[test]
    fn test_builder_allow_deny_accumulate() {
        let builder = NtpServer::builder()
            .allow("192.168.0.0/24".parse().unwrap())
            .allow("10.0.0.0/8".parse().unwrap())
            .deny("10.1.0.0/16".parse().unwrap());
        assert_eq!(builder.allow_list.as_ref().unwrap().len(), 2);
        assert_eq!(builder.deny_list.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_builder_rate_limit() {
        let builder = NtpServer::builder().rate_limit(RateLimitConfig::default());
        assert!(builder.rate_limit.unwrap().max_requests_per_window > 0);
    }

    #[tokio::test]
    async fn test_builder_build_binds_socket() {
        let server = NtpServer::builder()
            .listen("127.0.0.1:0")
            .build()
            .await
            .expect("should bind to ephemeral port");

        let addr = server.local_addr().unwrap();
        assert!(addr.port() > 0);
        assert!(server.metrics().is_none());
    }

    #[tokio::test]
    async fn test_build_rejects_bad_config() {
        let err = NtpServer::builder()
            .listen("127.0.0.1:0")
            .stratum(protocol::Stratum(16))
            .build()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = NtpServer::builder()
            .listen("127.0.0.1:0")
            .workers(0)
            .build()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = NtpServer::builder()
            .listen("not an address")
            .build()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_server_system_state_access() {
        let server = NtpServer::builder()
            .listen("127.0.0.1:0")
            .stratum(protocol::Stratum(2))
            .build()
            .await
            .unwrap();

        let state = server.system_state().read().unwrap();
        assert_eq!(state.stratum, protocol::Stratum(2));
    }

    #[tokio::test]
    async fn test_run_until_answers_then_stops() {
        let t = protocol::TimestampFormat {
            seconds: 3_913_056_000,
            fraction: 0,
        };
        let metrics = Arc::new(ServerMetrics::new());
        let server = NtpServer::builder()
            .listen("127.0.0.1:0")
            .workers(2)
            .clock(ManualClock::new(t))
            .metrics(metrics.clone())
            .build()
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let request = protocol::serialize(&protocol::Packet {
            transmit_timestamp: protocol::TimestampFormat {
                seconds: 3_913_055_999,
                fraction: 42,
            },
            ..Default::default()
        });
        client.send_to(&request, addr).await.unwrap();
        let mut buf = [0u8; 128];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .expect("no response")
            .unwrap();
        assert_eq!(len, 48);
        let resp = protocol::parse(&buf[..len]).unwrap();
        assert_eq!(resp.receive_timestamp, t);
        assert_eq!(resp.transmit_timestamp, t);
        assert_eq!(resp.origin_timestamp.fraction, 42);

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_received, 1);
        assert_eq!(snap.responses_sent, 1);
        assert_eq!(snap.bytes_sent, 48);
    }
}
