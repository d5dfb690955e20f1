// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Entries untouched for this long are dropped first when the table is full.
const STALE_AFTER: Duration = Duration::from_secs(24 * 3600);

/// Per-client rate limiting, keyed by IP address only (RFC 9109).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateLimitConfig {
    /// Requests a single address may make within one window.
    pub max_requests_per_window: u32,
    /// Length of the counting window.
    pub window_duration: Duration,
    /// Shortest accepted gap between two admitted requests.
    pub min_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_requests_per_window: 20,
            window_duration: Duration::from_secs(60),
            min_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RateLimitResult {
    Allow,
    /// Answer with KoD RATE.
    RateExceeded,
}

#[derive(Clone, Debug)]
struct ClientState {
    last_admitted: Option<Instant>,
    window_start: Instant,
    window_count: u32,
    last_seen: Instant,
}

impl ClientState {
    fn new(now: Instant) -> Self {
        ClientState {
            last_admitted: None,
            window_start: now,
            window_count: 0,
            last_seen: now,
        }
    }

    /// Rejected requests count toward the window but never move
    /// `last_admitted`, so a client that backs off is served again.
    fn admit(&mut self, now: Instant, config: &RateLimitConfig) -> RateLimitResult {
        let too_soon = self
            .last_admitted
            .is_some_and(|last| now.duration_since(last) < config.min_interval);
        if too_soon {
            return RateLimitResult::RateExceeded;
        }

        if now.duration_since(self.window_start) > config.window_duration {
            self.window_start = now;
            self.window_count = 0;
        }
        self.window_count = self.window_count.saturating_add(1);
        if self.window_count > config.max_requests_per_window {
            return RateLimitResult::RateExceeded;
        }

        self.last_admitted = Some(now);
        RateLimitResult::Allow
    }
}

/// Bounded table of per-client rate limit state.
///
/// When full, stale entries are dropped first, then the least recently
/// seen client.
#[derive(Debug)]
pub struct ClientTable {
    clients: HashMap<IpAddr, ClientState>,
    capacity: usize,
}

impl ClientTable {
    /// A table holding at most `capacity` clients (at least one).
    pub fn new(capacity: usize) -> Self {
        ClientTable {
            clients: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are tracked.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Record a request from `ip` at `now` and decide whether to serve it.
    pub(crate) fn admit(
        &mut self,
        ip: IpAddr,
        now: Instant,
        config: &RateLimitConfig,
    ) -> RateLimitResult {
        if !self.clients.contains_key(&ip) && self.clients.len() >= self.capacity {
            self.make_room(now);
        }
        let client = self
            .clients
            .entry(ip)
            .or_insert_with(|| ClientState::new(now));
        client.last_seen = now;
        client.admit(now, config)
    }

    fn make_room(&mut self, now: Instant) {
        self.clients
            .retain(|_, c| now.duration_since(c.last_seen) < STALE_AFTER);
        if self.clients.len() < self.capacity {
            return;
        }
        let oldest = self
            .clients
            .iter()
            .min_by_key(|(_, c)| c.last_seen)
            .map(|(ip, _)| *ip);
        if let Some(ip) = oldest {
            self.clients.remove(&ip);
        }
    }
}
