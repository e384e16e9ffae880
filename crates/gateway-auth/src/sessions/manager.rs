//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session lifecycle management
//!
//! The manager owns every mutation of session records: creation at login
//! (with oldest-first eviction at the per-user cap), activity refresh on
//! verified requests, explicit revocation, and the periodic timeout sweep.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::SessionConfig;
use crate::error::AuthResult;
use crate::sessions::model::{RequestMeta, Session};
use crate::sessions::stats::SessionStats;
use crate::sessions::store::SessionStore;

/// Session manager
pub struct SessionManager {
    /// Session storage backend
    store: Arc<dyn SessionStore>,

    /// Session configuration
    config: SessionConfig,

    /// Statistics
    stats: Arc<RwLock<SessionStats>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            stats: Arc::new(RwLock::new(SessionStats::new())),
        }
    }

    /// Create a session for a user, evicting their oldest session while the
    /// per-user cap would be exceeded.
    pub async fn create_session(&self, user_id: &str, meta: &RequestMeta) -> AuthResult<Session> {
        while self.store.count_for_user(user_id).await? >= self.config.max_sessions_per_user {
            let Some(oldest) = self.store.oldest_for_user(user_id).await? else {
                break;
            };
            self.store.remove(&oldest.id).await?;
            info!(
                user_id = %user_id,
                session_id = %oldest.id,
                "Evicted oldest session at per-user cap"
            );
            let mut stats = self.stats.write().await;
            stats.record_evicted();
        }

        let session = Session::new(user_id, meta);
        self.store.insert(&session).await?;

        {
            let mut stats = self.stats.write().await;
            stats.record_created();
        }

        debug!(user_id = %user_id, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Fetch a session if it is still active and within the timeout.
    ///
    /// A session found past its timeout is removed on the spot.
    pub async fn get_active(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let Some(session) = self.store.get(session_id).await? else {
            return Ok(None);
        };

        if !session.is_active {
            return Ok(None);
        }

        if session.is_expired(self.config.timeout()) {
            self.store.remove(session_id).await?;
            let mut stats = self.stats.write().await;
            stats.record_swept(1);
            debug!(session_id = %session_id, "Session expired on access");
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Refresh a session's activity timestamp
    pub async fn touch(&self, session_id: &str) -> AuthResult<bool> {
        let touched = self.store.touch(session_id, Utc::now()).await?;
        if touched {
            let mut stats = self.stats.write().await;
            stats.record_refresh();
        }
        Ok(touched)
    }

    /// Revoke one session. Revoking an absent session is a no-op.
    pub async fn revoke(&self, session_id: &str) -> AuthResult<bool> {
        match self.store.remove(session_id).await? {
            Some(mut session) => {
                session.is_active = false;
                info!(
                    user_id = %session.user_id,
                    session_id = %session_id,
                    "Session revoked"
                );
                let mut stats = self.stats.write().await;
                stats.record_revoked(1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Revoke every session of a user, returning how many were dropped
    pub async fn revoke_all(&self, user_id: &str) -> AuthResult<usize> {
        let removed = self.store.remove_all_for_user(user_id).await?;
        if removed > 0 {
            info!(user_id = %user_id, count = removed, "All sessions revoked");
            let mut stats = self.stats.write().await;
            stats.record_revoked(removed as u64);
        }
        Ok(removed)
    }

    /// Read-only projection of a user's live sessions for device management
    pub async fn active_sessions(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        let timeout = self.config.timeout();
        let sessions = self.store.sessions_for_user(user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.is_active && !session.is_expired(timeout))
            .collect())
    }

    /// Drop every session past the inactivity timeout
    pub async fn sweep(&self) -> AuthResult<usize> {
        let swept = self.store.sweep_expired(self.config.timeout()).await?;
        if swept > 0 {
            info!(count = swept, "Swept expired sessions");
            let mut stats = self.stats.write().await;
            stats.record_swept(swept as u64);
        }
        Ok(swept)
    }

    /// Spawn the periodic sweep task. The task runs until aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = std::time::Duration::from_secs(manager.config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(err) = manager.sweep().await {
                    error!("Session sweep failed: {}", err);
                }
            }
        })
    }

    /// Total sessions currently held
    pub async fn session_count(&self) -> AuthResult<usize> {
        self.store.count().await
    }

    /// Verify the session store is reachable
    pub async fn health_check(&self) -> AuthResult<()> {
        self.store.health_check().await
    }

    /// Get session statistics
    pub async fn get_stats(&self) -> SessionStats {
        self.stats.read().await.clone()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::store::MemorySessionStore;

    fn manager() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            SessionConfig::default(),
        ))
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
            device_info: None,
        }
    }

    #[tokio::test]
    async fn test_sixth_session_evicts_exactly_the_oldest() {
        let manager = manager();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(manager.create_session("u-1", &meta()).await.unwrap().id);
        }
        assert_eq!(manager.active_sessions("u-1").await.unwrap().len(), 5);

        let sixth = manager.create_session("u-1", &meta()).await.unwrap();

        let remaining = manager.active_sessions("u-1").await.unwrap();
        assert_eq!(remaining.len(), 5);
        // Oldest is gone
        assert!(!remaining.iter().any(|s| s.id == ids[0]));
        // The rest survived
        for id in &ids[1..] {
            assert!(remaining.iter().any(|s| &s.id == id));
        }
        assert!(remaining.iter().any(|s| s.id == sixth.id));

        let stats = manager.get_stats().await;
        assert_eq!(stats.sessions_evicted, 1);
    }

    #[tokio::test]
    async fn test_cap_never_exceeded_across_many_logins() {
        let manager = manager();
        for _ in 0..12 {
            manager.create_session("u-1", &meta()).await.unwrap();
        }
        assert_eq!(manager.active_sessions("u-1").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let manager = manager();
        let session = manager.create_session("u-1", &meta()).await.unwrap();

        assert!(manager.revoke(&session.id).await.unwrap());
        assert!(!manager.revoke(&session.id).await.unwrap());
        assert!(!manager.revoke("never-existed").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let manager = manager();
        for _ in 0..3 {
            manager.create_session("u-1", &meta()).await.unwrap();
        }
        manager.create_session("u-2", &meta()).await.unwrap();

        assert_eq!(manager.revoke_all("u-1").await.unwrap(), 3);
        assert_eq!(manager.revoke_all("u-1").await.unwrap(), 0);
        assert_eq!(manager.active_sessions("u-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_not_active() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), SessionConfig::default());

        let session = manager.create_session("u-1", &meta()).await.unwrap();
        let stale = Utc::now() - chrono::Duration::minutes(45);
        store.touch(&session.id, stale).await.unwrap();

        assert!(manager.get_active(&session.id).await.unwrap().is_none());
        // Expired-on-access sessions are removed outright
        assert!(store.get(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_keeps_session_alive() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), SessionConfig::default());

        let session = manager.create_session("u-1", &meta()).await.unwrap();
        let nearly_stale = Utc::now() - chrono::Duration::minutes(29);
        store.touch(&session.id, nearly_stale).await.unwrap();

        assert!(manager.touch(&session.id).await.unwrap());
        assert!(manager.get_active(&session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_drops_only_expired() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), SessionConfig::default());

        let stale = manager.create_session("u-1", &meta()).await.unwrap();
        let fresh = manager.create_session("u-1", &meta()).await.unwrap();
        store
            .touch(&stale.id, Utc::now() - chrono::Duration::hours(2))
            .await
            .unwrap();

        assert_eq!(manager.sweep().await.unwrap(), 1);
        assert!(store.get(&stale.id).await.unwrap().is_none());
        assert!(store.get(&fresh.id).await.unwrap().is_some());
    }
}
