// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared test helpers for server integration tests.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use ntp_server::protocol::{self, Packet};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Transmit timestamp carried by [`build_client_packet`].
pub(crate) const CLIENT_TRANSMIT: protocol::TimestampFormat = protocol::TimestampFormat {
    seconds: 0xE0000000,
    fraction: 0x12345678,
};

/// A server running on a loopback ephemeral port.
pub(crate) struct TestServer {
    pub(crate) addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<io::Result<()>>,
}

impl TestServer {
    /// Request shutdown and wait for every worker to stop.
    pub(crate) async fn shutdown(self) {
        let _ = self.stop.send(());
        tokio::time::timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}

/// Spawn a test server on `127.0.0.1` with an ephemeral port.
pub(crate) async fn spawn_test_server(builder: ntp_server::server::NtpServerBuilder) -> TestServer {
    let server = builder
        .listen("127.0.0.1:0")
        .build()
        .await
        .expect("failed to bind test server");
    let addr = server.local_addr().expect("failed to get local addr");
    let (stop, stop_rx) = oneshot::channel();
    let handle = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));
    TestServer { addr, stop, handle }
}

/// Build a minimal valid NTPv4 client request packet (48 bytes).
pub(crate) fn build_client_packet() -> [u8; 48] {
    protocol::serialize(&Packet {
        transmit_timestamp: CLIENT_TRANSMIT,
        ..Packet::default()
    })
}

/// Send a raw UDP packet to `addr` and receive the response with a timeout.
///
/// Returns `None` if the server doesn't respond within the timeout.
pub(crate) async fn send_receive_raw(
    addr: SocketAddr,
    packet: &[u8],
    timeout: Duration,
) -> Option<Vec<u8>> {
    let sock = UdpSocket::bind("127.0.0.1:0").await.expect("bind failed");
    sock.send_to(packet, addr).await.expect("send failed");

    let mut buf = vec![0u8; 2048];
    match tokio::time::timeout(timeout, sock.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => {
            buf.truncate(len);
            Some(buf)
        }
        _ => None,
    }
}

/// Parse a response buffer into a Packet.
pub(crate) fn parse_response(buf: &[u8]) -> Packet {
    assert_eq!(buf.len(), 48, "response must be exactly one header");
    protocol::parse(buf).expect("failed to parse response")
}
