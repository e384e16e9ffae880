//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Counter storage backends
//!
//! Quota counters must be visible to every worker in the pool, so the
//! production backend is Redis; the in-memory backend serves tests and
//! single-process deployments. Counters follow the fixed-window contract:
//! the expiry is set when a key is first incremented and left untouched
//! by later increments within the window.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::error::LimiterResult;

pub use memory::MemoryCounterStore;
pub use redis::RedisCounterStore;

/// Shared counter storage
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current count for a key; `None` when absent or expired
    async fn get(&self, key: &str) -> LimiterResult<Option<u64>>;

    /// Atomically increment a key, starting its TTL on first increment.
    /// Returns the new count.
    async fn increment_with_expiry(&self, key: &str, ttl_secs: u64) -> LimiterResult<u64>;

    /// Keys matching a `*` glob pattern
    async fn keys(&self, pattern: &str) -> LimiterResult<Vec<String>>;

    /// Remove a key
    async fn remove(&self, key: &str) -> LimiterResult<()>;

    /// Verify the backend is reachable
    async fn ping(&self) -> LimiterResult<()>;
}
