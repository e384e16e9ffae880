//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Redis counter store

use async_trait::async_trait;

use crate::error::{LimiterError, LimiterResult};
use crate::store::CounterStore;

/// Redis counter store.
///
/// Counters are plain INCR keys; the TTL is attached when INCR reports a
/// count of 1, which is exactly the first increment of a window. INCR is
/// atomic, so concurrent workers never lose increments.
pub struct RedisCounterStore {
    /// Redis connection manager
    connection_manager: redis::aio::ConnectionManager,

    /// Key prefix for counter storage
    key_prefix: String,
}

impl RedisCounterStore {
    /// Connect to Redis with the default key prefix
    pub async fn new(url: &str) -> LimiterResult<Self> {
        Self::new_with_prefix(url, "palisade:").await
    }

    /// Connect to Redis with a custom key prefix
    pub async fn new_with_prefix(url: &str, key_prefix: &str) -> LimiterResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| LimiterError::store(format!("Failed to create Redis client: {}", e)))?;

        let connection_manager =
            redis::aio::ConnectionManager::new(client).await.map_err(|e| {
                LimiterError::store(format!("Failed to create Redis connection manager: {}", e))
            })?;

        Ok(Self {
            connection_manager,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> LimiterResult<Option<u64>> {
        let mut conn = self.connection_manager.clone();
        let count: Option<u64> = redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| LimiterError::store(format!("Failed to read counter: {}", e)))?;
        Ok(count)
    }

    async fn increment_with_expiry(&self, key: &str, ttl_secs: u64) -> LimiterResult<u64> {
        let full_key = self.full_key(key);
        let mut conn = self.connection_manager.clone();

        let count: u64 = redis::cmd("INCR")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| LimiterError::store(format!("Failed to increment counter: {}", e)))?;

        // First increment of the window starts its TTL
        if count == 1 {
            let _: i64 = redis::cmd("EXPIRE")
                .arg(&full_key)
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await
                .map_err(|e| LimiterError::store(format!("Failed to set counter TTL: {}", e)))?;
        }

        Ok(count)
    }

    async fn keys(&self, pattern: &str) -> LimiterResult<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(self.full_key(pattern))
            .query_async(&mut conn)
            .await
            .map_err(|e| LimiterError::store(format!("Failed to list counters: {}", e)))?;

        Ok(keys
            .into_iter()
            .map(|key| {
                key.strip_prefix(&self.key_prefix)
                    .map(|stripped| stripped.to_string())
                    .unwrap_or(key)
            })
            .collect())
    }

    async fn remove(&self, key: &str) -> LimiterResult<()> {
        let mut conn = self.connection_manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| LimiterError::store(format!("Failed to remove counter: {}", e)))?;
        Ok(())
    }

    async fn ping(&self) -> LimiterResult<()> {
        let mut conn = self.connection_manager.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| LimiterError::store(format!("Redis ping failed: {}", e)))?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(LimiterError::store(format!(
                "Unexpected PING response: {}",
                pong
            )))
        }
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}
