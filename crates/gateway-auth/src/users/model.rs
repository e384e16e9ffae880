//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! User model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account status gating whether a user may log in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Account may log in
    Active,

    /// Account disabled by an administrator
    Inactive,

    /// Account suspended pending review
    Suspended,
}

impl AccountStatus {
    /// Whether the status permits login
    pub fn allows_login(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,

    /// Username, unique within the store
    pub username: String,

    /// Email address
    pub email: String,

    /// Bcrypt password hash
    pub password_hash: String,

    /// Role name from the role table
    pub role: String,

    /// Account status
    pub status: AccountStatus,

    /// Consecutive failed login attempts
    pub failed_login_attempts: u32,

    /// Account is locked until this instant, when set
    pub locked_until: Option<DateTime<Utc>>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user
    pub fn new(username: &str, email: &str, password_hash: String, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: role.to_string(),
            status: AccountStatus::Active,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    /// Whether a lockout is currently in force
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }
}
