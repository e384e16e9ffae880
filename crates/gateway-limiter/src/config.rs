//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Rate limiter configuration

use serde::{Deserialize, Serialize};

use crate::rules::RateLimitRule;

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Whether rate limiting is enforced
    pub enabled: bool,

    /// Rules in precedence-relevant registration order
    #[serde(default)]
    pub rules: Vec<RateLimitRule>,

    /// IPs that always pass without consuming quota
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Denials from one IP before it is blacklisted
    pub violation_threshold: u64,

    /// Rolling TTL of the per-IP violation counter in seconds
    pub violation_ttl_secs: u64,

    /// How long a blacklisted IP stays banned in seconds
    pub blacklist_duration_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: Vec::new(),
            whitelist: Vec::new(),
            violation_threshold: crate::DEFAULT_VIOLATION_THRESHOLD,
            violation_ttl_secs: crate::DEFAULT_VIOLATION_TTL_SECS,
            blacklist_duration_secs: crate::DEFAULT_BLACKLIST_DURATION_SECS,
        }
    }
}

impl LimiterConfig {
    /// Validate the limiter configuration
    pub fn validate(&self) -> crate::LimiterResult<()> {
        for rule in &self.rules {
            if rule.max_requests == 0 {
                return Err(crate::LimiterError::config(format!(
                    "rule {} allows zero requests",
                    rule.name
                )));
            }
            if rule.window_secs == 0 {
                return Err(crate::LimiterError::config(format!(
                    "rule {} has a zero-length window",
                    rule.name
                )));
            }
        }

        let mut names: Vec<&str> = self.rules.iter().map(|rule| rule.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.rules.len() {
            return Err(crate::LimiterError::config(
                "rule names must be unique".to_string(),
            ));
        }

        Ok(())
    }
}
