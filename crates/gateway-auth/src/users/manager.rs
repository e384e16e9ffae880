//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! User lifecycle and credential verification
//!
//! Credential checking deliberately reports unknown users and wrong
//! passwords with the same error so callers cannot probe which usernames
//! exist. Lockout state and account status are checked before the bcrypt
//! comparison, which is the expensive step.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::UserConfig;
use crate::error::{AuthError, AuthResult};
use crate::users::model::{AccountStatus, User};
use crate::users::password;
use crate::users::stats::UserStats;
use crate::users::store::UserStore;

/// User manager
pub struct UserManager {
    /// User storage backend
    store: Arc<dyn UserStore>,

    /// User configuration
    config: UserConfig,

    /// Statistics
    stats: Arc<RwLock<UserStats>>,
}

impl UserManager {
    /// Create a new user manager
    pub fn new(store: Arc<dyn UserStore>, config: UserConfig) -> Self {
        Self {
            store,
            config,
            stats: Arc::new(RwLock::new(UserStats::new())),
        }
    }

    /// Create a user after password-policy validation
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> AuthResult<User> {
        password::validate_policy(password, &self.config)?;

        if self.store.get_by_username(username).await?.is_some() {
            return Err(AuthError::user_already_exists(username.to_string()));
        }

        let hash = password::hash(password).await?;
        let user = User::new(username, email, hash, role);
        self.store.insert(&user).await?;

        {
            let mut stats = self.stats.write().await;
            stats.record_created();
        }

        info!(user_id = %user.id, username = %username, role = %role, "User created");
        Ok(user)
    }

    /// Verify a username/password pair, enforcing status and lockout.
    ///
    /// On success: failed-attempt counter resets and `last_login_at` is
    /// stamped. On mismatch: the counter increments, and crossing the
    /// configured threshold locks the account for the lockout duration.
    pub async fn verify_credentials(&self, username: &str, candidate: &str) -> AuthResult<User> {
        let Some(mut user) = self.store.get_by_username(username).await? else {
            let mut stats = self.stats.write().await;
            stats.record_login(false);
            return Err(AuthError::invalid_credentials(
                "Unknown user or wrong password".to_string(),
            ));
        };

        let now = Utc::now();
        if user.is_locked(now) {
            let mut stats = self.stats.write().await;
            stats.record_login(false);
            return Err(AuthError::account_locked(format!(
                "Account locked until {}",
                user.locked_until.unwrap_or(now)
            )));
        }

        if !user.status.allows_login() {
            let mut stats = self.stats.write().await;
            stats.record_login(false);
            return Err(AuthError::account_inactive(format!(
                "Account status is {:?}",
                user.status
            )));
        }

        if !password::verify(candidate, &user.password_hash).await? {
            user.failed_login_attempts += 1;
            if user.failed_login_attempts >= self.config.max_login_attempts as u32 {
                user.locked_until =
                    Some(now + Duration::seconds(self.config.lockout_duration_secs as i64));
                user.failed_login_attempts = 0;
                warn!(
                    user_id = %user.id,
                    username = %username,
                    "Account locked after repeated failed logins"
                );
                let mut stats = self.stats.write().await;
                stats.record_locked();
            }
            self.store.update(&user).await?;

            let mut stats = self.stats.write().await;
            stats.record_login(false);
            return Err(AuthError::invalid_credentials(
                "Unknown user or wrong password".to_string(),
            ));
        }

        user.failed_login_attempts = 0;
        user.locked_until = None;
        user.last_login_at = Some(now);
        self.store.update(&user).await?;

        {
            let mut stats = self.stats.write().await;
            stats.record_login(true);
        }
        Ok(user)
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: &str) -> AuthResult<Option<User>> {
        self.store.get(user_id).await
    }

    /// Fetch a user by username
    pub async fn get_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.store.get_by_username(username).await
    }

    /// Replace a user's password after policy validation
    pub async fn set_password(&self, user_id: &str, password: &str) -> AuthResult<()> {
        password::validate_policy(password, &self.config)?;

        let Some(mut user) = self.store.get(user_id).await? else {
            return Err(AuthError::user_not_found(user_id.to_string()));
        };

        user.password_hash = password::hash(password).await?;
        user.failed_login_attempts = 0;
        user.locked_until = None;
        self.store.update(&user).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Change a user's account status
    pub async fn set_status(&self, user_id: &str, status: AccountStatus) -> AuthResult<()> {
        let Some(mut user) = self.store.get(user_id).await? else {
            return Err(AuthError::user_not_found(user_id.to_string()));
        };

        user.status = status;
        self.store.update(&user).await?;
        info!(user_id = %user_id, status = ?status, "Account status changed");
        Ok(())
    }

    /// Get user statistics
    pub async fn get_stats(&self) -> UserStats {
        self.stats.read().await.clone()
    }
}

impl std::fmt::Debug for UserManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserManager")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::store::MemoryUserStore;

    fn manager() -> UserManager {
        UserManager::new(Arc::new(MemoryUserStore::new()), UserConfig::default())
    }

    async fn with_alice(manager: &UserManager) -> User {
        manager
            .create_user("alice", "alice@example.com", "CorrectHorse1", "student")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_verify() {
        let manager = manager();
        let created = with_alice(&manager).await;

        let verified = manager
            .verify_credentials("alice", "CorrectHorse1")
            .await
            .unwrap();
        assert_eq!(verified.id, created.id);
        assert!(verified.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_alike() {
        let manager = manager();
        with_alice(&manager).await;

        let wrong = manager.verify_credentials("alice", "WrongPass1").await;
        let unknown = manager.verify_credentials("mallory", "WrongPass1").await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials(_))));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let manager = manager();
        with_alice(&manager).await;

        let duplicate = manager
            .create_user("alice", "other@example.com", "CorrectHorse1", "student")
            .await;
        assert!(matches!(duplicate, Err(AuthError::UserAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let manager = manager();
        let weak = manager
            .create_user("bob", "bob@example.com", "weak", "student")
            .await;
        assert!(matches!(weak, Err(AuthError::PasswordRejected(_))));
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_login() {
        let manager = manager();
        let user = with_alice(&manager).await;
        manager
            .set_status(&user.id, AccountStatus::Inactive)
            .await
            .unwrap();

        let outcome = manager.verify_credentials("alice", "CorrectHorse1").await;
        assert!(matches!(outcome, Err(AuthError::AccountInactive(_))));
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let manager = manager();
        with_alice(&manager).await;

        // Default threshold is 5 attempts
        for _ in 0..5 {
            let _ = manager.verify_credentials("alice", "WrongPass1").await;
        }

        // Even the right password is refused while locked
        let locked = manager.verify_credentials("alice", "CorrectHorse1").await;
        assert!(matches!(locked, Err(AuthError::AccountLocked(_))));

        let stats = manager.get_stats().await;
        assert_eq!(stats.accounts_locked, 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        let manager = manager();
        let user = with_alice(&manager).await;

        for _ in 0..4 {
            let _ = manager.verify_credentials("alice", "WrongPass1").await;
        }
        manager
            .verify_credentials("alice", "CorrectHorse1")
            .await
            .unwrap();

        let fresh = manager.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(fresh.failed_login_attempts, 0);

        // The slate is clean: four more failures still do not lock
        for _ in 0..4 {
            let _ = manager.verify_credentials("alice", "WrongPass1").await;
        }
        assert!(manager
            .verify_credentials("alice", "CorrectHorse1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_set_password() {
        let manager = manager();
        let user = with_alice(&manager).await;

        manager
            .set_password(&user.id, "NewSecret99")
            .await
            .unwrap();
        assert!(manager
            .verify_credentials("alice", "CorrectHorse1")
            .await
            .is_err());
        assert!(manager
            .verify_credentials("alice", "NewSecret99")
            .await
            .is_ok());
    }
}
