//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Rate limiter service
//!
//! Fixed-window counting per matched rule, with whitelist bypass,
//! blacklist short-circuit, violation tracking, and a fail-open posture:
//! when the counter store is unreachable the request goes through and the
//! failure is logged. Rate-limiting availability is secondary to
//! application availability.
//!
//! Fixed windows admit bursts at window boundaries. That is a stated
//! characteristic of the algorithm, not a defect.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::LimiterConfig;
use crate::error::LimiterResult;
use crate::rules::{RequestDescriptor, RuleTable};
use crate::stats::LimiterStats;
use crate::store::CounterStore;
use crate::violations::{IpBlacklist, ViolationTracker};

/// Quota metadata for response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInfo {
    /// The matched rule's request budget
    pub limit: u64,

    /// Requests left in the current window
    pub remaining: u64,

    /// The matched rule's window in seconds
    pub window_secs: u64,
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request may proceed; quota info present when a rule matched
    Allowed(Option<QuotaInfo>),

    /// Over quota for the matched rule
    RateLimited {
        /// Seconds the client should wait before retrying
        retry_after_secs: u64,

        /// The matched rule's request budget
        limit: u64,
    },

    /// The client IP is banned; no retry hint, the ban is fixed-length
    Blacklisted,
}

impl RateLimitDecision {
    /// Whether the request may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed(_))
    }
}

/// Rate limiter service
pub struct RateLimiter {
    /// Ordered rule table
    rules: RuleTable,

    /// Shared counter store
    store: Arc<dyn CounterStore>,

    /// Per-IP violation tracking
    violations: ViolationTracker,

    /// Process-local IP blacklist
    blacklist: IpBlacklist,

    /// IPs that bypass rate limiting
    whitelist: Arc<RwLock<HashSet<String>>>,

    /// Limiter configuration
    config: LimiterConfig,

    /// Statistics
    stats: Arc<RwLock<LimiterStats>>,
}

impl RateLimiter {
    /// Build a limiter from validated configuration and a counter store
    pub fn new(config: LimiterConfig, store: Arc<dyn CounterStore>) -> LimiterResult<Self> {
        config.validate()?;

        let whitelist: HashSet<String> = config.whitelist.iter().cloned().collect();
        Ok(Self {
            rules: RuleTable::new(config.rules.clone()),
            violations: ViolationTracker::new(Arc::clone(&store), config.violation_ttl_secs),
            blacklist: IpBlacklist::new(),
            whitelist: Arc::new(RwLock::new(whitelist)),
            store,
            config,
            stats: Arc::new(RwLock::new(LimiterStats::new())),
        })
    }

    /// Check a request against the rule table.
    ///
    /// Never fails: counter store errors log and allow.
    pub async fn check(&self, request: &RequestDescriptor) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision::Allowed(None);
        }

        // Whitelisted IPs pass without consuming quota
        if self.whitelist.read().await.contains(&request.ip_address) {
            let mut stats = self.stats.write().await;
            stats.record_whitelisted();
            return RateLimitDecision::Allowed(None);
        }

        // Banned IPs are refused before any rule matching
        if self.blacklist.contains(&request.ip_address).await {
            let mut stats = self.stats.write().await;
            stats.record_blacklist_denial();
            return RateLimitDecision::Blacklisted;
        }

        let Some(rule) = self.rules.match_rule(&request.method, &request.path) else {
            let mut stats = self.stats.write().await;
            stats.record_allowed();
            return RateLimitDecision::Allowed(None);
        };

        let key = rule.counter_key(request);

        let count = match self.store.get(&key).await {
            Ok(count) => count.unwrap_or(0),
            Err(err) => {
                error!(
                    rule = %rule.name,
                    "Counter store unreachable, failing open: {}",
                    err
                );
                let mut stats = self.stats.write().await;
                stats.record_store_failure();
                stats.record_allowed();
                return RateLimitDecision::Allowed(None);
            }
        };

        if count >= rule.max_requests {
            warn!(
                rule = %rule.name,
                ip_address = %request.ip_address,
                path = %request.path,
                count = count,
                limit = rule.max_requests,
                "Rate limit exceeded"
            );
            {
                let mut stats = self.stats.write().await;
                stats.record_denied();
            }
            self.record_violation(&request.ip_address).await;
            return RateLimitDecision::RateLimited {
                retry_after_secs: rule.window_secs,
                limit: rule.max_requests,
            };
        }

        let new_count = match self
            .store
            .increment_with_expiry(&key, rule.window_secs)
            .await
        {
            Ok(new_count) => new_count,
            Err(err) => {
                error!(
                    rule = %rule.name,
                    "Counter increment failed, failing open: {}",
                    err
                );
                let mut stats = self.stats.write().await;
                stats.record_store_failure();
                stats.record_allowed();
                return RateLimitDecision::Allowed(None);
            }
        };

        {
            let mut stats = self.stats.write().await;
            stats.record_allowed();
        }
        RateLimitDecision::Allowed(Some(QuotaInfo {
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(new_count),
            window_secs: rule.window_secs,
        }))
    }

    /// Count a violation and ban the IP at the threshold
    async fn record_violation(&self, ip: &str) {
        let total = match self.violations.record(ip).await {
            Ok(total) => total,
            Err(err) => {
                // Violation bookkeeping rides the same store; the denial stands
                error!("Failed to record violation: {}", err);
                let mut stats = self.stats.write().await;
                stats.record_store_failure();
                return;
            }
        };

        if total >= self.config.violation_threshold {
            info!(
                ip_address = %ip,
                violations = total,
                ban_secs = self.config.blacklist_duration_secs,
                "IP blacklisted after repeated violations"
            );
            self.blacklist
                .ban(ip, self.config.blacklist_duration_secs)
                .await;
            let mut stats = self.stats.write().await;
            stats.record_ip_blacklisted();
        }
    }

    /// Whether an IP is currently banned
    pub async fn is_blacklisted(&self, ip: &str) -> bool {
        self.blacklist.contains(ip).await
    }

    /// Lift an IP's ban ahead of schedule
    pub async fn unban(&self, ip: &str) -> bool {
        self.blacklist.unban(ip).await
    }

    /// Banned IPs with their lapse times
    pub async fn banned_ips(&self) -> Vec<(String, chrono::DateTime<chrono::Utc>)> {
        self.blacklist.list().await
    }

    /// Add an IP to the whitelist at runtime
    pub async fn add_whitelisted(&self, ip: &str) {
        let mut whitelist = self.whitelist.write().await;
        whitelist.insert(ip.to_string());
    }

    /// Remove an IP from the whitelist
    pub async fn remove_whitelisted(&self, ip: &str) -> bool {
        let mut whitelist = self.whitelist.write().await;
        whitelist.remove(ip)
    }

    /// Verify the counter store is reachable
    pub async fn health_check(&self) -> LimiterResult<()> {
        self.store.ping().await
    }

    /// Get limiter statistics
    pub async fn get_stats(&self) -> LimiterStats {
        self.stats.read().await.clone()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rules", &self.rules.len())
            .field("enabled", &self.config.enabled)
            .finish()
    }
}
