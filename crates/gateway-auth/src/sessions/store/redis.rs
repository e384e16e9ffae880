//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Redis session store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::{AuthError, AuthResult};
use crate::sessions::model::Session;
use crate::sessions::store::{past_timeout, SessionStore};

/// Redis session store.
///
/// Sessions are JSON blobs under `{prefix}session:{id}`; a per-user sorted
/// set under `{prefix}user_sessions:{user_id}`, scored by creation time,
/// keeps eviction order. Shared by every worker in a pool, which is what
/// keeps round-robin request distribution correct.
pub struct RedisSessionStore {
    /// Redis connection manager
    connection_manager: redis::aio::ConnectionManager,

    /// Key prefix for session storage
    key_prefix: String,
}

impl RedisSessionStore {
    /// Connect to Redis with the default key prefix
    pub async fn new(url: &str) -> AuthResult<Self> {
        Self::new_with_prefix(url, "palisade:").await
    }

    /// Connect to Redis with a custom key prefix
    pub async fn new_with_prefix(url: &str, key_prefix: &str) -> AuthResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AuthError::store(format!("Failed to create Redis client: {}", e)))?;

        let connection_manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| {
                AuthError::store(format!("Failed to create Redis connection manager: {}", e))
            })?;

        Ok(Self {
            connection_manager,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}session:{}", self.key_prefix, session_id)
    }

    fn user_key(&self, user_id: &str) -> String {
        format!("{}user_sessions:{}", self.key_prefix, user_id)
    }

    async fn fetch(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let mut conn = self.connection_manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to fetch session: {}", e)))?;

        match raw {
            Some(json) => {
                let session = serde_json::from_str(&json).map_err(|e| {
                    AuthError::store(format!("Failed to deserialize session: {}", e))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn write(&self, session: &Session) -> AuthResult<()> {
        let json = serde_json::to_string(session)
            .map_err(|e| AuthError::store(format!("Failed to serialize session: {}", e)))?;

        let mut conn = self.connection_manager.clone();
        let _: () = redis::cmd("SET")
            .arg(self.session_key(&session.id))
            .arg(&json)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to store session: {}", e)))?;
        Ok(())
    }

    /// Member ids of a user's sorted set, creation order
    async fn user_members(&self, user_id: &str) -> AuthResult<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let ids: Vec<String> = redis::cmd("ZRANGE")
            .arg(self.user_key(user_id))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to list user sessions: {}", e)))?;
        Ok(ids)
    }

    /// Drop a stale index entry whose session blob is gone
    async fn prune_member(&self, user_id: &str, session_id: &str) -> AuthResult<()> {
        let mut conn = self.connection_manager.clone();
        let _: i64 = redis::cmd("ZREM")
            .arg(self.user_key(user_id))
            .arg(session_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to prune session index: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, session: &Session) -> AuthResult<()> {
        self.write(session).await?;

        let mut conn = self.connection_manager.clone();
        let _: i64 = redis::cmd("ZADD")
            .arg(self.user_key(&session.user_id))
            .arg(session.created_at.timestamp_millis())
            .arg(&session.id)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to index session: {}", e)))?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> AuthResult<Option<Session>> {
        self.fetch(session_id).await
    }

    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> AuthResult<bool> {
        match self.fetch(session_id).await? {
            Some(mut session) => {
                session.last_activity = at;
                self.write(&session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let Some(session) = self.fetch(session_id).await? else {
            return Ok(None);
        };

        let mut conn = self.connection_manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to remove session: {}", e)))?;

        self.prune_member(&session.user_id, session_id).await?;
        Ok(Some(session))
    }

    async fn sessions_for_user(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        let ids = self.user_members(user_id).await?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch(&id).await? {
                Some(session) => sessions.push(session),
                None => self.prune_member(user_id, &id).await?,
            }
        }
        Ok(sessions)
    }

    async fn oldest_for_user(&self, user_id: &str) -> AuthResult<Option<Session>> {
        for id in self.user_members(user_id).await? {
            match self.fetch(&id).await? {
                Some(session) => return Ok(Some(session)),
                None => self.prune_member(user_id, &id).await?,
            }
        }
        Ok(None)
    }

    async fn count_for_user(&self, user_id: &str) -> AuthResult<usize> {
        Ok(self.sessions_for_user(user_id).await?.len())
    }

    async fn remove_all_for_user(&self, user_id: &str) -> AuthResult<usize> {
        let ids = self.user_members(user_id).await?;
        let mut conn = self.connection_manager.clone();

        let mut removed = 0;
        for id in &ids {
            let deleted: i64 = redis::cmd("DEL")
                .arg(self.session_key(id))
                .query_async(&mut conn)
                .await
                .map_err(|e| AuthError::store(format!("Failed to remove session: {}", e)))?;
            removed += deleted as usize;
        }

        let _: i64 = redis::cmd("DEL")
            .arg(self.user_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to drop session index: {}", e)))?;

        Ok(removed)
    }

    async fn sweep_expired(&self, timeout: Duration) -> AuthResult<usize> {
        let mut conn = self.connection_manager.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}session:*", self.key_prefix))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to scan sessions: {}", e)))?;

        let now = Utc::now();
        let prefix_len = self.key_prefix.len() + "session:".len();

        let mut swept = 0;
        for key in keys {
            let session_id = &key[prefix_len..];
            if let Some(session) = self.fetch(session_id).await? {
                if past_timeout(&session, timeout, now) && self.remove(session_id).await?.is_some()
                {
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }

    async fn count(&self) -> AuthResult<usize> {
        let mut conn = self.connection_manager.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}session:*", self.key_prefix))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Failed to count sessions: {}", e)))?;
        Ok(keys.len())
    }

    async fn health_check(&self) -> AuthResult<()> {
        let mut conn = self.connection_manager.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store(format!("Redis health check failed: {}", e)))?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(AuthError::store(format!(
                "Unexpected PING response: {}",
                pong
            )))
        }
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}
