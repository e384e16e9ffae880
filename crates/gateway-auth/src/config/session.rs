//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session configuration

use serde::{Deserialize, Serialize};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity timeout in seconds
    pub timeout_secs: u64,

    /// Interval between expired-session sweeps in seconds
    pub sweep_interval_secs: u64,

    /// Maximum concurrent sessions per user
    pub max_sessions_per_user: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: crate::DEFAULT_SESSION_TIMEOUT_SECS,
            sweep_interval_secs: crate::DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
            max_sessions_per_user: crate::DEFAULT_MAX_SESSIONS_PER_USER,
        }
    }
}

impl SessionConfig {
    /// Inactivity timeout as a chrono duration
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.timeout_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout_secs, 30 * 60);
        assert_eq!(config.sweep_interval_secs, 300);
        assert_eq!(config.max_sessions_per_user, 5);
    }
}
