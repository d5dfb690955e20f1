// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Per-datagram server logic, independent of any socket or runtime.
//!
//! Provides request validation, response building, rate limiting, access control,
//! and the metrics the [`crate::server`] loop updates, per RFC 5905 and RFC 8633.

mod access_control;
mod metrics;
mod network;
mod pipeline;
mod rate_limit;
mod response;
mod state;
mod validation;

pub use self::access_control::{AccessControl, AccessResult};
pub use self::metrics::{MetricsSnapshot, ServerMetrics};
pub use self::network::IpNet;
pub use self::pipeline::{DropReason, HandleResult, RequestContext, handle_request};
pub use self::rate_limit::{ClientTable, RateLimitConfig};
pub use self::response::{build_response, build_server_response, serialize_response};
pub use self::state::{DEFAULT_POLL, DEFAULT_PRECISION, DEFAULT_REFERENCE_ID, ServerSystemState};

pub(crate) use self::rate_limit::RateLimitResult;
pub(crate) use self::response::build_kod_response;
pub(crate) use self::validation::validate_client_request;
