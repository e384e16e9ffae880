//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Authentication manager façade
//!
//! Wires users, sessions, tokens, and permission evaluation into the four
//! operations the pipeline consumes: authenticate, verify, refresh, and
//! authorize. Verification and refresh never error across this boundary;
//! every failure collapses to `None` so call sites have exactly one
//! unauthenticated branch and clients learn nothing about why.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthResult;
use crate::rbac::{MembershipLookup, PermissionEvaluator, RoleRegistry, SecurityContext};
use crate::sessions::{RequestMeta, Session, SessionManager, SessionStore};
use crate::tokens::{TokenClaims, TokenManager, TokenPair, TokenType};
use crate::users::{User, UserManager, UserStore};

/// Login credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Username
    pub username: String,

    /// Plaintext password, verified against the stored hash
    pub password: String,
}

/// Successful authentication outcome
#[derive(Debug, Clone)]
pub struct AuthSuccess {
    /// The authenticated user
    pub user: User,

    /// Short-lived access token
    pub access_token: String,

    /// Long-lived refresh token
    pub refresh_token: String,

    /// Session both tokens are bound to
    pub session_id: String,
}

/// Aggregated statistics across the auth subsystems
#[derive(Debug, Clone)]
pub struct AuthStats {
    /// User management statistics
    pub users: crate::users::UserStats,

    /// Session statistics
    pub sessions: crate::sessions::SessionStats,

    /// Token statistics
    pub tokens: crate::tokens::TokenStats,

    /// Permission evaluation statistics
    pub evaluations: crate::rbac::EvaluationStats,
}

/// Authentication manager
pub struct AuthManager {
    /// User and credential management
    users: Arc<UserManager>,

    /// Session lifecycle
    sessions: Arc<SessionManager>,

    /// Token issuance and validation
    tokens: Arc<TokenManager>,

    /// Permission evaluation
    evaluator: Arc<PermissionEvaluator>,

    /// Authentication configuration
    config: AuthConfig,
}

impl AuthManager {
    /// Wire the auth subsystems together from injected stores.
    ///
    /// Validates the configuration up front; a bad role table or empty
    /// secret fails construction rather than surfacing at request time.
    pub fn new(
        config: AuthConfig,
        user_store: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
        membership: Arc<dyn MembershipLookup>,
    ) -> AuthResult<Self> {
        config.validate()?;

        let registry = Arc::new(RoleRegistry::new(
            config.rbac.roles.clone(),
            config.rbac.super_admin_role.clone(),
        ));

        Ok(Self {
            users: Arc::new(UserManager::new(user_store, config.users.clone())),
            sessions: Arc::new(SessionManager::new(session_store, config.session.clone())),
            tokens: Arc::new(TokenManager::new(config.jwt.clone())),
            evaluator: Arc::new(PermissionEvaluator::new(
                registry,
                membership,
                config.rbac.cache_ttl(),
            )),
            config,
        })
    }

    /// Authenticate a credential pair and open a session.
    ///
    /// Session creation applies the per-user cap, evicting the user's
    /// oldest session first. Both tokens are bound to the new session.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        meta: &RequestMeta,
    ) -> AuthResult<AuthSuccess> {
        let user = match self
            .users
            .verify_credentials(&credentials.username, &credentials.password)
            .await
        {
            Ok(user) => user,
            Err(err) => {
                warn!(
                    username = %credentials.username,
                    ip_address = %meta.ip_address,
                    "Authentication failed: {}",
                    err
                );
                return Err(err);
            }
        };

        let session = self.sessions.create_session(&user.id, meta).await?;
        let pair = self
            .tokens
            .issue_pair(&user.id, &user.role, &session.id)
            .await?;

        info!(
            user_id = %user.id,
            session_id = %session.id,
            ip_address = %meta.ip_address,
            "User authenticated"
        );

        Ok(AuthSuccess {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            session_id: session.id,
        })
    }

    /// Verify an access token, requiring its session to be live.
    ///
    /// Refreshes the session's activity timestamp on success. Any failure,
    /// including a store error, yields `None`.
    pub async fn verify(&self, access_token: &str) -> Option<TokenClaims> {
        let claims = match self.tokens.validate(access_token, TokenType::Access).await {
            Ok(claims) => claims,
            Err(err) => {
                debug!("Token rejected: {}", err);
                return None;
            }
        };

        let session = match self.sessions.get_active(claims.session_id()).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!(session_id = %claims.session_id(), "Token session is gone");
                return None;
            }
            Err(err) => {
                warn!("Session lookup failed during verification: {}", err);
                return None;
            }
        };

        if session.user_id != claims.user_id() {
            warn!(
                session_id = %claims.session_id(),
                "Token user does not match session owner"
            );
            return None;
        }

        if let Err(err) = self.sessions.touch(claims.session_id()).await {
            warn!("Failed to refresh session activity: {}", err);
        }

        Some(claims)
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The session is kept; both new tokens bind to the same session id.
    pub async fn refresh(&self, refresh_token: &str) -> Option<TokenPair> {
        let claims = match self
            .tokens
            .validate(refresh_token, TokenType::Refresh)
            .await
        {
            Ok(claims) => claims,
            Err(err) => {
                debug!("Refresh token rejected: {}", err);
                return None;
            }
        };

        match self.sessions.get_active(claims.session_id()).await {
            Ok(Some(_)) => {}
            _ => {
                debug!(session_id = %claims.session_id(), "Refresh session is gone");
                return None;
            }
        }

        let pair = match self
            .tokens
            .issue_pair(claims.user_id(), &claims.role, claims.session_id())
            .await
        {
            Ok(pair) => pair,
            Err(err) => {
                warn!("Failed to reissue tokens: {}", err);
                return None;
            }
        };

        if let Err(err) = self.sessions.touch(claims.session_id()).await {
            warn!("Failed to refresh session activity: {}", err);
        }

        debug!(
            user_id = %claims.user_id(),
            session_id = %claims.session_id(),
            "Tokens refreshed"
        );
        Some(pair)
    }

    /// Revoke one session; a no-op when it is already gone
    pub async fn logout(&self, session_id: &str) -> AuthResult<bool> {
        self.sessions.revoke(session_id).await
    }

    /// Revoke every session of a user
    pub async fn logout_all(&self, user_id: &str) -> AuthResult<usize> {
        self.sessions.revoke_all(user_id).await
    }

    /// A user's live sessions, for device management
    pub async fn active_sessions(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        self.sessions.active_sessions(user_id).await
    }

    /// Decide whether the context's user may perform an action.
    ///
    /// With RBAC disabled in configuration, everything is allowed.
    pub async fn authorize(
        &self,
        context: &SecurityContext,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
    ) -> bool {
        if !self.config.rbac.enabled {
            return true;
        }
        self.evaluator
            .evaluate(context, resource, action, resource_id)
            .await
    }

    /// Drop cached permission results for a user after a role or
    /// membership change
    pub async fn invalidate_permissions(&self, user_id: &str) {
        self.evaluator.invalidate_user(user_id).await;
    }

    /// Drop every cached permission result
    pub async fn clear_permission_cache(&self) {
        self.evaluator.clear_cache().await;
    }

    /// Spawn the periodic expired-session sweep
    pub fn spawn_session_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.sessions.spawn_sweeper()
    }

    /// The user manager
    pub fn users(&self) -> &Arc<UserManager> {
        &self.users
    }

    /// The session manager
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The token manager
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// The permission evaluator
    pub fn evaluator(&self) -> &Arc<PermissionEvaluator> {
        &self.evaluator
    }

    /// The configuration the manager was built with
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify backing stores are reachable
    pub async fn health_check(&self) -> AuthResult<()> {
        self.sessions.health_check().await
    }

    /// Aggregated statistics across the subsystems
    pub async fn get_stats(&self) -> AuthStats {
        AuthStats {
            users: self.users.get_stats().await,
            sessions: self.sessions.get_stats().await,
            tokens: self.tokens.get_stats().await,
            evaluations: self.evaluator.get_stats().await,
        }
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("rbac_enabled", &self.config.rbac.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::MemoryMembershipDirectory;
    use crate::sessions::MemorySessionStore;
    use crate::users::MemoryUserStore;

    async fn manager() -> AuthManager {
        let manager = AuthManager::new(
            AuthConfig::default(),
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryMembershipDirectory::new()),
        )
        .unwrap();
        manager
            .users()
            .create_user("alice", "alice@example.com", "CorrectHorse1", "student")
            .await
            .unwrap();
        manager
    }

    fn alice() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            password: "CorrectHorse1".to_string(),
        }
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
            device_info: None,
        }
    }

    #[tokio::test]
    async fn test_authenticate_then_verify() {
        let manager = manager().await;
        let success = manager.authenticate(&alice(), &meta()).await.unwrap();

        let claims = manager.verify(&success.access_token).await.unwrap();
        assert_eq!(claims.user_id(), success.user.id);
        assert_eq!(claims.session_id(), success.session_id);
        assert_eq!(claims.role, "student");
    }

    #[tokio::test]
    async fn test_bad_credentials_error() {
        let manager = manager().await;
        let bad = Credentials {
            username: "alice".to_string(),
            password: "WrongPass1".to_string(),
        };
        assert!(manager.authenticate(&bad, &meta()).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_revokes_unexpired_token() {
        let manager = manager().await;
        let success = manager.authenticate(&alice(), &meta()).await.unwrap();

        assert!(manager.verify(&success.access_token).await.is_some());
        assert!(manager.logout(&success.session_id).await.unwrap());

        // The token itself is unexpired but its session is gone
        assert!(manager.verify(&success.access_token).await.is_none());
        // Logout is idempotent
        assert!(!manager.logout(&success.session_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_all_revokes_every_device() {
        let manager = manager().await;
        let first = manager.authenticate(&alice(), &meta()).await.unwrap();
        let second = manager.authenticate(&alice(), &meta()).await.unwrap();

        assert_eq!(manager.logout_all(&first.user.id).await.unwrap(), 2);
        assert!(manager.verify(&first.access_token).await.is_none());
        assert!(manager.verify(&second.access_token).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_keeps_the_session() {
        let manager = manager().await;
        let success = manager.authenticate(&alice(), &meta()).await.unwrap();

        let pair = manager.refresh(&success.refresh_token).await.unwrap();
        let claims = manager.verify(&pair.access_token).await.unwrap();
        assert_eq!(claims.session_id(), success.session_id);

        // One session throughout; refresh does not open another
        assert_eq!(
            manager.active_sessions(&success.user.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_refresh_requires_live_session() {
        let manager = manager().await;
        let success = manager.authenticate(&alice(), &meta()).await.unwrap();

        manager.logout(&success.session_id).await.unwrap();
        assert!(manager.refresh(&success.refresh_token).await.is_none());
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let manager = manager().await;
        let success = manager.authenticate(&alice(), &meta()).await.unwrap();

        assert!(manager.refresh(&success.access_token).await.is_none());
        assert!(manager.verify(&success.refresh_token).await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthenticated() {
        let manager = manager().await;
        assert!(manager.verify("garbage").await.is_none());
        assert!(manager.refresh("garbage").await.is_none());
    }

    #[tokio::test]
    async fn test_authorize_uses_role_table() {
        let manager = manager().await;
        let success = manager.authenticate(&alice(), &meta()).await.unwrap();

        let ctx = SecurityContext::new(&success.user.id, &success.user.role, "10.0.0.1", "test");
        // Students hold own_grades on grades:read
        assert!(manager.authorize(&ctx, "grades", "read", None).await);
        assert!(!manager.authorize(&ctx, "grades", "write", None).await);
    }

    #[tokio::test]
    async fn test_authorize_disabled_allows_everything() {
        let mut config = AuthConfig::default();
        config.rbac.enabled = false;
        let manager = AuthManager::new(
            config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryMembershipDirectory::new()),
        )
        .unwrap();

        let ctx = SecurityContext::new("u-1", "nobody", "10.0.0.1", "test");
        assert!(manager.authorize(&ctx, "anything", "at-all", None).await);
    }
}
