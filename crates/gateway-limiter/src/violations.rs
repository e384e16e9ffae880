//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Violation tracking and the IP blacklist
//!
//! Every rate-limit denial counts as a violation against the client IP,
//! tracked in the shared counter store under a 24 h rolling TTL that is
//! independent of any rule window. Crossing the violation threshold puts
//! the IP on a process-local blacklist; removal is scheduled, not checked
//! on read, so a ban lapses exactly when its timer fires. The shared
//! violation counter is what makes every worker converge on the same ban.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::LimiterResult;
use crate::store::CounterStore;

/// Per-IP violation counting in the shared store
pub struct ViolationTracker {
    /// Shared counter store
    store: Arc<dyn CounterStore>,

    /// Violation counter TTL in seconds
    ttl_secs: u64,
}

impl ViolationTracker {
    /// Create a tracker over the shared store
    pub fn new(store: Arc<dyn CounterStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    fn key(ip: &str) -> String {
        format!("violations:{}", ip)
    }

    /// Record one violation, returning the IP's running total
    pub async fn record(&self, ip: &str) -> LimiterResult<u64> {
        self.store
            .increment_with_expiry(&Self::key(ip), self.ttl_secs)
            .await
    }

    /// The IP's current violation count
    pub async fn count(&self, ip: &str) -> LimiterResult<u64> {
        Ok(self.store.get(&Self::key(ip)).await?.unwrap_or(0))
    }

    /// Drop an IP's violation counter
    pub async fn reset(&self, ip: &str) -> LimiterResult<()> {
        self.store.remove(&Self::key(ip)).await
    }
}

impl std::fmt::Debug for ViolationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViolationTracker")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Process-local IP blacklist with scheduled removal
#[derive(Debug, Default)]
pub struct IpBlacklist {
    /// Banned IPs and when their ban lapses
    banned: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl IpBlacklist {
    /// Create an empty blacklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Ban an IP for the given duration, scheduling its removal.
    ///
    /// Re-banning extends the ban; the earlier removal timer notices the
    /// extension and leaves the entry in place.
    pub async fn ban(&self, ip: &str, duration_secs: u64) {
        let until = Utc::now() + Duration::seconds(duration_secs as i64);
        {
            let mut banned = self.banned.write().await;
            banned.insert(ip.to_string(), until);
        }

        let banned = Arc::clone(&self.banned);
        let ip = ip.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(duration_secs)).await;
            let mut banned = banned.write().await;
            // A later ban replaced the lapse time; leave that one to its own timer
            if banned.get(&ip) == Some(&until) {
                banned.remove(&ip);
            }
        });
    }

    /// Whether an IP is currently banned
    pub async fn contains(&self, ip: &str) -> bool {
        self.banned.read().await.contains_key(ip)
    }

    /// Lift a ban ahead of schedule
    pub async fn unban(&self, ip: &str) -> bool {
        self.banned.write().await.remove(ip).is_some()
    }

    /// Banned IPs with their lapse times, for operators
    pub async fn list(&self) -> Vec<(String, DateTime<Utc>)> {
        self.banned
            .read()
            .await
            .iter()
            .map(|(ip, until)| (ip.clone(), *until))
            .collect()
    }

    /// Number of banned IPs
    pub async fn len(&self) -> usize {
        self.banned.read().await.len()
    }

    /// Whether no IPs are banned
    pub async fn is_empty(&self) -> bool {
        self.banned.read().await.is_empty()
    }
}
