//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Evaluation result cache
//!
//! Caches allow/deny results per (user, resource, action, resource id) so
//! repeated checks skip the membership lookups. Entries live for a short
//! TTL and are dropped explicitly when a user's role or memberships change.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry {
    allowed: bool,
    expires_at: DateTime<Utc>,
}

/// TTL cache of permission evaluation results
#[derive(Debug)]
pub struct PermissionCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl PermissionCache {
    /// Create a cache with the given entry TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn cache_key(
        user_id: &str,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
    ) -> String {
        format!(
            "{}:{}:{}:{}",
            user_id,
            resource,
            action,
            resource_id.unwrap_or("-")
        )
    }

    /// Look up a cached result; expired entries count as misses
    pub async fn get(
        &self,
        user_id: &str,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
    ) -> Option<bool> {
        let key = Self::cache_key(user_id, resource, action, resource_id);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if entry.expires_at < Utc::now() {
            return None;
        }
        Some(entry.allowed)
    }

    /// Store an evaluation result
    pub async fn insert(
        &self,
        user_id: &str,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
        allowed: bool,
    ) {
        let key = Self::cache_key(user_id, resource, action, resource_id);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                allowed,
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    /// Drop every cached result for one user
    pub async fn invalidate_user(&self, user_id: &str) {
        let prefix = format!("{}:", user_id);
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Drop everything, for bulk role or membership changes
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Remove expired entries, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        before - entries.len()
    }

    /// Number of live entries (including not-yet-purged expired ones)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
