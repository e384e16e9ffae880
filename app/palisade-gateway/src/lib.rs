//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! The Palisade gateway binary
//!
//! One executable, two roles. The supervisor role owns the public
//! listener, spawns a pool of workers (this same binary re-executed with
//! `PALISADE_ROLE=worker`), health-checks and restarts them, and proxies
//! traffic round-robin. The worker role serves the actual request
//! pipeline: request context, rate limiting, token authentication, and
//! per-route permission guards over the auth API and application routes.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod proxy;
pub mod state;
pub mod supervisor;
pub mod worker;

// Re-export main types
pub use config::GatewayConfig;
pub use error::{ApiError, ErrorResponse};
pub use state::{RequestContext, WorkerState};

/// Gateway name
pub const GATEWAY_NAME: &str = "palisade-gateway";

/// Gateway version
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default external listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default proxy forward timeout in seconds
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 30;
