//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session storage backends
//!
//! Sessions live behind this seam so deployments can choose where they are
//! held: in process memory for a single worker, or in Redis so every worker
//! in a pool sees the same records.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::AuthResult;
use crate::sessions::model::Session;

pub use memory::MemorySessionStore;
pub use redis::RedisSessionStore;

/// Session storage backend
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session record
    async fn insert(&self, session: &Session) -> AuthResult<()>;

    /// Fetch a session by id
    async fn get(&self, session_id: &str) -> AuthResult<Option<Session>>;

    /// Update a session's last-activity timestamp; false when absent
    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> AuthResult<bool>;

    /// Remove a session, returning it when it existed
    async fn remove(&self, session_id: &str) -> AuthResult<Option<Session>>;

    /// All sessions for a user, oldest created first
    async fn sessions_for_user(&self, user_id: &str) -> AuthResult<Vec<Session>>;

    /// The user's oldest session by creation order
    async fn oldest_for_user(&self, user_id: &str) -> AuthResult<Option<Session>>;

    /// Number of sessions currently held for a user
    async fn count_for_user(&self, user_id: &str) -> AuthResult<usize>;

    /// Remove every session for a user, returning how many were dropped
    async fn remove_all_for_user(&self, user_id: &str) -> AuthResult<usize>;

    /// Drop sessions whose inactivity exceeds the timeout
    async fn sweep_expired(&self, timeout: Duration) -> AuthResult<usize>;

    /// Total number of sessions held
    async fn count(&self) -> AuthResult<usize>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> AuthResult<()>;
}

/// Helper shared by backends: whether a record is past the timeout
pub(crate) fn past_timeout(session: &Session, timeout: Duration, now: DateTime<Utc>) -> bool {
    now - session.last_activity > timeout
}
