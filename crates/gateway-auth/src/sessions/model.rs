//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session record definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One authenticated device/browser instance.
///
/// A session is active from the instant it is created. It leaves the store
/// through explicit revocation (logout, logout-all, eviction) or through
/// the timeout sweep once `last_activity` falls too far behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session id
    pub id: String,

    /// Owning user id
    pub user_id: String,

    /// Client IP address at login
    pub ip_address: String,

    /// Client user agent at login
    pub user_agent: String,

    /// Creation time; eviction order is oldest-created first
    pub created_at: DateTime<Utc>,

    /// Updated on every successful token verification
    pub last_activity: DateTime<Utc>,

    /// Cleared when the session is revoked
    pub is_active: bool,

    /// Free-form device description, when the client supplied one
    pub device_info: Option<String>,
}

/// Request metadata captured at login
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Client IP address
    pub ip_address: String,

    /// Client user agent
    pub user_agent: String,

    /// Free-form device description
    pub device_info: Option<String>,
}

impl Session {
    /// Create a new active session for a user
    pub fn new(user_id: &str, meta: &RequestMeta) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: now,
            last_activity: now,
            is_active: true,
            device_info: meta.device_info.clone(),
        }
    }

    /// Whether the session has outlived the inactivity timeout
    pub fn is_expired(&self, timeout: Duration) -> bool {
        Utc::now() - self.last_activity > timeout
    }

    /// Refresh the activity timestamp
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
