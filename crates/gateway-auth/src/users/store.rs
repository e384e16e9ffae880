//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! User storage seam
//!
//! Credential material lives outside this crate in production; the seam
//! lets deployments plug in their own user database while tests and
//! single-process runs use the in-memory store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AuthResult;
use crate::users::model::User;

/// User storage backend
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user record
    async fn insert(&self, user: &User) -> AuthResult<()>;

    /// Fetch a user by id
    async fn get(&self, user_id: &str) -> AuthResult<Option<User>>;

    /// Fetch a user by username
    async fn get_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Replace a user record; false when absent
    async fn update(&self, user: &User) -> AuthResult<bool>;

    /// Number of users held
    async fn count(&self) -> AuthResult<usize>;
}

/// In-memory user store
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    /// User records by id
    users: Arc<RwLock<HashMap<String, User>>>,

    /// Username to user id
    username_index: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryUserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> AuthResult<()> {
        {
            let mut users = self.users.write().await;
            users.insert(user.id.clone(), user.clone());
        }
        {
            let mut index = self.username_index.write().await;
            index.insert(user.username.clone(), user.id.clone());
        }
        Ok(())
    }

    async fn get(&self, user_id: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let user_id = {
            let index = self.username_index.read().await;
            index.get(username).cloned()
        };
        match user_id {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }

    async fn update(&self, user: &User) -> AuthResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> AuthResult<usize> {
        let users = self.users.read().await;
        Ok(users.len())
    }
}
