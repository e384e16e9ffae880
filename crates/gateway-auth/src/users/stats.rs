//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! User management statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// User management statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStats {
    /// Users created
    pub users_created: u64,

    /// Successful credential verifications
    pub logins_succeeded: u64,

    /// Failed credential verifications
    pub logins_failed: u64,

    /// Accounts locked by the failed-attempt threshold
    pub accounts_locked: u64,

    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Create new user statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user creation
    pub fn record_created(&mut self) {
        self.users_created += 1;
    }

    /// Record a login outcome
    pub fn record_login(&mut self, succeeded: bool) {
        if succeeded {
            self.logins_succeeded += 1;
            self.last_login = Some(Utc::now());
        } else {
            self.logins_failed += 1;
        }
    }

    /// Record an account lockout
    pub fn record_locked(&mut self) {
        self.accounts_locked += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_stats_recording() {
        let mut stats = UserStats::new();
        stats.record_created();
        stats.record_login(true);
        stats.record_login(false);
        stats.record_locked();

        assert_eq!(stats.users_created, 1);
        assert_eq!(stats.logins_succeeded, 1);
        assert_eq!(stats.logins_failed, 1);
        assert_eq!(stats.accounts_locked, 1);
        assert!(stats.last_login.is_some());
    }
}
