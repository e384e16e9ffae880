//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Rate limiter statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rate limiter statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct LimiterStats {
    /// Requests checked
    pub checks: u64,

    /// Requests allowed
    pub allowed: u64,

    /// Requests denied over quota
    pub denied: u64,

    /// Requests denied by the blacklist
    pub blacklist_denials: u64,

    /// Requests passed by the whitelist
    pub whitelisted_passes: u64,

    /// Store failures that failed open
    pub store_failures: u64,

    /// Violations recorded
    pub violations_recorded: u64,

    /// IPs blacklisted
    pub ips_blacklisted: u64,

    /// Last denial
    pub last_denial: Option<DateTime<Utc>>,
}

impl LimiterStats {
    /// Create new limiter statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allowed check
    pub fn record_allowed(&mut self) {
        self.checks += 1;
        self.allowed += 1;
    }

    /// Record a whitelist pass
    pub fn record_whitelisted(&mut self) {
        self.checks += 1;
        self.allowed += 1;
        self.whitelisted_passes += 1;
    }

    /// Record an over-quota denial
    pub fn record_denied(&mut self) {
        self.checks += 1;
        self.denied += 1;
        self.violations_recorded += 1;
        self.last_denial = Some(Utc::now());
    }

    /// Record a blacklist denial
    pub fn record_blacklist_denial(&mut self) {
        self.checks += 1;
        self.blacklist_denials += 1;
        self.last_denial = Some(Utc::now());
    }

    /// Record a store failure that failed open
    pub fn record_store_failure(&mut self) {
        self.store_failures += 1;
    }

    /// Record an IP crossing the violation threshold
    pub fn record_ip_blacklisted(&mut self) {
        self.ips_blacklisted += 1;
    }
}
