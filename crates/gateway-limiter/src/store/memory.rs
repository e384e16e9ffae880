//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! In-memory counter store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::LimiterResult;
use crate::store::CounterStore;

#[derive(Debug, Clone)]
struct Counter {
    count: u64,
    expires_at: DateTime<Utc>,
}

/// In-memory counter store.
///
/// Expired counters are dropped lazily on access. Only correct for a
/// single process; pools share quota through the Redis store.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Arc<RwLock<HashMap<String, Counter>>>,
}

impl MemoryCounterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn matches_glob(key: &str, pattern: &str) -> bool {
        match pattern.split_once('*') {
            Some((prefix, suffix)) => {
                key.len() >= prefix.len() + suffix.len()
                    && key.starts_with(prefix)
                    && key.ends_with(suffix)
            }
            None => key == pattern,
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> LimiterResult<Option<u64>> {
        let now = Utc::now();
        let mut counters = self.counters.write().await;
        match counters.get(key) {
            Some(counter) if counter.expires_at > now => Ok(Some(counter.count)),
            Some(_) => {
                counters.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn increment_with_expiry(&self, key: &str, ttl_secs: u64) -> LimiterResult<u64> {
        let now = Utc::now();
        let mut counters = self.counters.write().await;
        let counter = counters
            .entry(key.to_string())
            .and_modify(|counter| {
                if counter.expires_at <= now {
                    // Window rolled over; start a fresh one
                    counter.count = 0;
                    counter.expires_at = now + Duration::seconds(ttl_secs as i64);
                }
            })
            .or_insert_with(|| Counter {
                count: 0,
                expires_at: now + Duration::seconds(ttl_secs as i64),
            });
        counter.count += 1;
        Ok(counter.count)
    }

    async fn keys(&self, pattern: &str) -> LimiterResult<Vec<String>> {
        let now = Utc::now();
        let counters = self.counters.read().await;
        Ok(counters
            .iter()
            .filter(|(key, counter)| {
                counter.expires_at > now && Self::matches_glob(key, pattern)
            })
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn remove(&self, key: &str) -> LimiterResult<()> {
        let mut counters = self.counters.write().await;
        counters.remove(key);
        Ok(())
    }

    async fn ping(&self) -> LimiterResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_and_get() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        assert_eq!(store.increment_with_expiry("k", 60).await.unwrap(), 1);
        assert_eq!(store.increment_with_expiry("k", 60).await.unwrap(), 2);
        assert_eq!(store.get("k").await.unwrap(), Some(2));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_counter_restarts_window() {
        let store = MemoryCounterStore::new();
        {
            let mut counters = store.counters.write().await;
            counters.insert(
                "k".to_string(),
                Counter {
                    count: 9,
                    expires_at: Utc::now() - Duration::seconds(1),
                },
            );
        }

        // Expired counters read as absent
        assert_eq!(store.get("k").await.unwrap(), None);
        // A new increment starts over at 1
        assert_eq!(store.increment_with_expiry("k", 60).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_keys_glob() {
        let store = MemoryCounterStore::new();
        store.increment_with_expiry("rl:login:a", 60).await.unwrap();
        store.increment_with_expiry("rl:login:b", 60).await.unwrap();
        store.increment_with_expiry("viol:a", 60).await.unwrap();

        let mut matched = store.keys("rl:login:*").await.unwrap();
        matched.sort();
        assert_eq!(matched, vec!["rl:login:a", "rl:login:b"]);
        assert_eq!(store.keys("viol:a").await.unwrap(), vec!["viol:a"]);
        assert!(store.keys("missing:*").await.unwrap().is_empty());
    }
}
