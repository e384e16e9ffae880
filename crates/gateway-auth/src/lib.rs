//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session, token, and RBAC services for the Palisade gateway
//!
//! This crate owns the authentication and authorization core of the
//! gateway:
//!
//! - **Users**: credential storage seam, bcrypt password verification,
//!   account status, and failed-attempt lockout.
//! - **Sessions**: server-side session records behind a store seam
//!   (in-memory or Redis), with a per-user cap that evicts oldest-first,
//!   activity refresh, idempotent revocation, and a timeout sweep.
//! - **Tokens**: HS256 access/refresh JWTs bound to sessions. There is no
//!   token blacklist; removing a session instantly invalidates every
//!   token bound to it.
//! - **RBAC**: a static role table, a closed condition enum, and an
//!   evaluator with wildcard matching, one-level inheritance, and a short
//!   TTL result cache.
//!
//! Everything is wired together by [`AuthManager`], which exposes the
//! four operations the request pipeline consumes: `authenticate`,
//! `verify`, `refresh`, and `authorize`.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use gateway_auth::{
//!     AuthConfig, AuthManager, Credentials, MemoryMembershipDirectory,
//!     MemorySessionStore, MemoryUserStore, RequestMeta,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = AuthManager::new(
//!         AuthConfig::default(),
//!         Arc::new(MemoryUserStore::new()),
//!         Arc::new(MemorySessionStore::new()),
//!         Arc::new(MemoryMembershipDirectory::new()),
//!     )?;
//!
//!     manager
//!         .users()
//!         .create_user("alice", "alice@example.com", "CorrectHorse1", "student")
//!         .await?;
//!
//!     let credentials = Credentials {
//!         username: "alice".to_string(),
//!         password: "CorrectHorse1".to_string(),
//!     };
//!     let success = manager
//!         .authenticate(&credentials, &RequestMeta::default())
//!         .await?;
//!
//!     assert!(manager.verify(&success.access_token).await.is_some());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod rbac;
pub mod sessions;
pub mod tokens;
pub mod users;

// Re-export commonly used types
pub use config::{AuthConfig, JwtConfig, RbacConfig, SessionConfig, UserConfig};
pub use error::{AuthError, AuthResult};
pub use manager::{AuthManager, AuthStats, AuthSuccess, Credentials};
pub use rbac::{
    Condition, EvaluationStats, MembershipLookup, MemoryMembershipDirectory, Permission,
    PermissionEvaluator, ResourceRef, Role, RoleRegistry, SecurityContext, UserRef, WILDCARD,
};
pub use sessions::{
    MemorySessionStore, RedisSessionStore, RequestMeta, Session, SessionManager, SessionStats,
    SessionStore,
};
pub use tokens::{TokenClaims, TokenManager, TokenPair, TokenStats, TokenType};
pub use users::{AccountStatus, MemoryUserStore, User, UserManager, UserStats, UserStore};

/// Crate version
pub const AUTH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserved role name that bypasses all permission checks
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Default access token lifetime (24 hours)
pub const DEFAULT_ACCESS_TOKEN_EXPIRATION_SECS: u64 = 24 * 60 * 60;

/// Default refresh token lifetime (7 days)
pub const DEFAULT_REFRESH_TOKEN_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default session inactivity timeout (30 minutes)
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;

/// Default interval between expired-session sweeps (5 minutes)
pub const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Default cap on concurrent sessions per user
pub const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;

/// Default permission result cache TTL (5 minutes)
pub const DEFAULT_PERMISSION_CACHE_TTL_SECS: u64 = 5 * 60;
