//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Rate limit rules and precedence matching
//!
//! Rules are registered once at startup, in configuration order. Matching
//! precedence: exact method+path, then wildcard-method exact path, then
//! the first registered rule whose path is a prefix of the request path.
//! Prefix registration order is part of the contract, so configurations
//! list the most specific prefixes first.

use serde::{Deserialize, Serialize};

/// How a rule derives its counter key from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Per client IP
    Ip,

    /// Per authenticated user, falling back to the client IP
    #[default]
    UserOrIp,

    /// Per client IP and request method+path
    IpAndPath,
}

/// One rate limit rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Rule name, unique; namespaces the rule's counters
    pub name: String,

    /// Path to match: exact or, during prefix matching, a path prefix
    pub path: String,

    /// Method to match; `None` matches any method
    #[serde(default)]
    pub method: Option<String>,

    /// Fixed window length in seconds
    pub window_secs: u64,

    /// Requests allowed per key per window
    pub max_requests: u64,

    /// Counter key derivation
    #[serde(default)]
    pub key_strategy: KeyStrategy,
}

/// Everything a rule needs to know about a request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Request method, uppercase
    pub method: String,

    /// Request path
    pub path: String,

    /// Client IP address
    pub ip_address: String,

    /// Authenticated user id, when the request carries one
    pub user_id: Option<String>,
}

impl RateLimitRule {
    /// Compute the counter key for a request, namespaced by rule name
    pub fn counter_key(&self, request: &RequestDescriptor) -> String {
        let client = match self.key_strategy {
            KeyStrategy::Ip => format!("ip:{}", request.ip_address),
            KeyStrategy::UserOrIp => match &request.user_id {
                Some(user_id) => format!("user:{}", user_id),
                None => format!("ip:{}", request.ip_address),
            },
            KeyStrategy::IpAndPath => format!(
                "ip:{}:{}:{}",
                request.ip_address, request.method, request.path
            ),
        };
        format!("{}:{}", self.name, client)
    }
}

/// Ordered rule table
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<RateLimitRule>,
}

impl RuleTable {
    /// Build a table from configuration-ordered rules
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self { rules }
    }

    /// Find the rule governing a request, by precedence
    pub fn match_rule(&self, method: &str, path: &str) -> Option<&RateLimitRule> {
        // Exact method+path
        if let Some(rule) = self.rules.iter().find(|rule| {
            rule.path == path && rule.method.as_deref() == Some(method)
        }) {
            return Some(rule);
        }

        // Wildcard-method exact path
        if let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.path == path && rule.method.is_none())
        {
            return Some(rule);
        }

        // First registered prefix match, method permitting
        self.rules.iter().find(|rule| {
            path.starts_with(&rule.path)
                && rule
                    .method
                    .as_deref()
                    .map(|m| m == method)
                    .unwrap_or(true)
        })
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table holds no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
