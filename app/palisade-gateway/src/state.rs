//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Shared worker state and per-request context

use chrono::{DateTime, Utc};
use gateway_auth::AuthManager;
use gateway_limiter::RateLimiter;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::GatewayConfig;
use crate::metrics::WorkerMetrics;

/// Everything a worker's handlers and middleware share
#[derive(Clone)]
pub struct WorkerState {
    /// Gateway configuration
    pub config: Arc<GatewayConfig>,

    /// Authentication, sessions, tokens, RBAC
    pub auth: Arc<AuthManager>,

    /// Rate limiting
    pub limiter: Arc<RateLimiter>,

    /// Traffic counters and memory sampling
    pub metrics: Arc<WorkerMetrics>,

    /// Graceful-stop signal back to the serve loop
    pub shutdown: mpsc::Sender<()>,

    /// This worker's id, as assigned by the supervisor
    pub worker_id: String,
}

/// Context resolved once per request by the outermost middleware
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request id, either propagated from the client or generated
    pub request_id: String,

    /// Client IP address
    pub ip_address: String,

    /// Client user agent
    pub user_agent: String,

    /// When the gateway first saw the request
    pub started_at: DateTime<Utc>,
}
