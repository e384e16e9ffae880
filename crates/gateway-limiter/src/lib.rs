//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Distributed rate limiting for the Palisade gateway
//!
//! Fixed-window request counting against a rule table, with the counters
//! held in a store every worker can reach, so quotas apply to the pool as
//! a whole rather than per process. On top of the counters sit per-IP
//! violation tracking, an auto-expiring blacklist, and a whitelist that
//! bypasses everything.
//!
//! The limiter fails open: when the counter store is down, requests pass
//! and the outage is logged.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use gateway_limiter::{
//!     KeyStrategy, LimiterConfig, MemoryCounterStore, RateLimitRule, RateLimiter,
//!     RequestDescriptor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = LimiterConfig::default();
//!     config.rules = vec![RateLimitRule {
//!         name: "login".to_string(),
//!         path: "/api/v1/auth/login".to_string(),
//!         method: Some("POST".to_string()),
//!         window_secs: 15 * 60,
//!         max_requests: 5,
//!         key_strategy: KeyStrategy::Ip,
//!     }];
//!
//!     let limiter = RateLimiter::new(config, Arc::new(MemoryCounterStore::new()))?;
//!     let request = RequestDescriptor {
//!         method: "POST".to_string(),
//!         path: "/api/v1/auth/login".to_string(),
//!         ip_address: "203.0.113.7".to_string(),
//!         user_id: None,
//!     };
//!     assert!(limiter.check(&request).await.is_allowed());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod limiter;
pub mod rules;
pub mod stats;
pub mod store;
pub mod violations;

// Re-export commonly used types
pub use config::LimiterConfig;
pub use error::{LimiterError, LimiterResult};
pub use limiter::{QuotaInfo, RateLimitDecision, RateLimiter};
pub use rules::{KeyStrategy, RateLimitRule, RequestDescriptor, RuleTable};
pub use stats::LimiterStats;
pub use store::{CounterStore, MemoryCounterStore, RedisCounterStore};
pub use violations::{IpBlacklist, ViolationTracker};

/// Crate version
pub const LIMITER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default denials from one IP before it is blacklisted
pub const DEFAULT_VIOLATION_THRESHOLD: u64 = 10;

/// Default rolling TTL of the per-IP violation counter (24 hours)
pub const DEFAULT_VIOLATION_TTL_SECS: u64 = 24 * 60 * 60;

/// Default ban length for a blacklisted IP (24 hours)
pub const DEFAULT_BLACKLIST_DURATION_SECS: u64 = 24 * 60 * 60;
