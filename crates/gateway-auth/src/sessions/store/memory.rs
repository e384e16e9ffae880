//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! In-memory session store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AuthResult;
use crate::sessions::model::Session;
use crate::sessions::store::{past_timeout, SessionStore};

/// In-memory session store.
///
/// Holds sessions in process memory, with a per-user index preserving
/// insertion order so oldest-first eviction is cheap. Correct for a single
/// worker; multi-worker pools use the Redis store instead.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    /// Session records by id
    sessions: Arc<RwLock<HashMap<String, Session>>>,

    /// Per-user session ids in insertion order
    user_index: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> AuthResult<()> {
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id.clone(), session.clone());
        }
        {
            let mut index = self.user_index.write().await;
            index
                .entry(session.user_id.clone())
                .or_default()
                .push(session.id.clone());
        }
        Ok(())
    }

    async fn get(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> AuthResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.last_activity = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };

        if let Some(session) = &removed {
            let mut index = self.user_index.write().await;
            if let Some(ids) = index.get_mut(&session.user_id) {
                ids.retain(|id| id != session_id);
                if ids.is_empty() {
                    index.remove(&session.user_id);
                }
            }
        }

        Ok(removed)
    }

    async fn sessions_for_user(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        let index = self.user_index.read().await;
        let Some(ids) = index.get(user_id) else {
            return Ok(Vec::new());
        };

        let sessions = self.sessions.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| sessions.get(id).cloned())
            .collect())
    }

    async fn oldest_for_user(&self, user_id: &str) -> AuthResult<Option<Session>> {
        let index = self.user_index.read().await;
        let Some(ids) = index.get(user_id) else {
            return Ok(None);
        };

        let sessions = self.sessions.read().await;
        Ok(ids.first().and_then(|id| sessions.get(id).cloned()))
    }

    async fn count_for_user(&self, user_id: &str) -> AuthResult<usize> {
        let index = self.user_index.read().await;
        Ok(index.get(user_id).map(|ids| ids.len()).unwrap_or(0))
    }

    async fn remove_all_for_user(&self, user_id: &str) -> AuthResult<usize> {
        let ids = {
            let mut index = self.user_index.write().await;
            index.remove(user_id).unwrap_or_default()
        };

        let mut sessions = self.sessions.write().await;
        let mut removed = 0;
        for id in ids {
            if sessions.remove(&id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn sweep_expired(&self, timeout: Duration) -> AuthResult<usize> {
        let now = Utc::now();
        let expired: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|session| past_timeout(session, timeout, now))
                .map(|session| session.id.clone())
                .collect()
        };

        let mut swept = 0;
        for id in &expired {
            if self.remove(id).await?.is_some() {
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn count(&self) -> AuthResult<usize> {
        let sessions = self.sessions.read().await;
        Ok(sessions.len())
    }

    async fn health_check(&self) -> AuthResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::model::RequestMeta;

    fn meta() -> RequestMeta {
        RequestMeta {
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
            device_info: None,
        }
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = MemorySessionStore::new();
        let session = Session::new("u-1", &meta());

        store.insert(&session).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let fetched = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "u-1");

        let removed = store.remove(&session.id).await.unwrap();
        assert!(removed.is_some());
        assert_eq!(store.count().await.unwrap(), 0);

        // Removing again is a no-op
        assert!(store.remove(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_index_preserves_insertion_order() {
        let store = MemorySessionStore::new();
        let first = Session::new("u-1", &meta());
        let second = Session::new("u-1", &meta());
        let third = Session::new("u-1", &meta());

        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();
        store.insert(&third).await.unwrap();

        assert_eq!(store.count_for_user("u-1").await.unwrap(), 3);
        let oldest = store.oldest_for_user("u-1").await.unwrap().unwrap();
        assert_eq!(oldest.id, first.id);

        store.remove(&first.id).await.unwrap();
        let oldest = store.oldest_for_user("u-1").await.unwrap().unwrap();
        assert_eq!(oldest.id, second.id);

        let listed = store.sessions_for_user("u-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, third.id);
    }

    #[tokio::test]
    async fn test_touch_updates_activity() {
        let store = MemorySessionStore::new();
        let session = Session::new("u-1", &meta());
        store.insert(&session).await.unwrap();

        let later = Utc::now() + Duration::minutes(10);
        assert!(store.touch(&session.id, later).await.unwrap());
        let fetched = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_activity, later);

        assert!(!store.touch("missing", later).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_all_for_user() {
        let store = MemorySessionStore::new();
        for _ in 0..3 {
            store.insert(&Session::new("u-1", &meta())).await.unwrap();
        }
        store.insert(&Session::new("u-2", &meta())).await.unwrap();

        assert_eq!(store.remove_all_for_user("u-1").await.unwrap(), 3);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.remove_all_for_user("u-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let store = MemorySessionStore::new();
        let mut stale = Session::new("u-1", &meta());
        stale.last_activity = Utc::now() - Duration::minutes(45);
        let fresh = Session::new("u-1", &meta());

        store.insert(&stale).await.unwrap();
        store.insert(&fresh).await.unwrap();

        let swept = store.sweep_expired(Duration::minutes(30)).await.unwrap();
        assert_eq!(swept, 1);
        assert!(store.get(&stale.id).await.unwrap().is_none());
        assert!(store.get(&fresh.id).await.unwrap().is_some());
    }
}
