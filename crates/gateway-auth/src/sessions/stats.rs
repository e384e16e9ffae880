//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Session statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Sessions created
    pub sessions_created: u64,

    /// Sessions revoked by logout, logout-all, or eviction
    pub sessions_revoked: u64,

    /// Sessions evicted by the per-user cap
    pub sessions_evicted: u64,

    /// Sessions dropped by the timeout sweep
    pub sessions_swept: u64,

    /// Activity refreshes from token verification
    pub activity_refreshes: u64,

    /// Last session creation
    pub last_created: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Create new session statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session creation
    pub fn record_created(&mut self) {
        self.sessions_created += 1;
        self.last_created = Some(Utc::now());
    }

    /// Record a revocation
    pub fn record_revoked(&mut self, count: u64) {
        self.sessions_revoked += count;
    }

    /// Record a cap eviction
    pub fn record_evicted(&mut self) {
        self.sessions_evicted += 1;
        self.sessions_revoked += 1;
    }

    /// Record sweep removals
    pub fn record_swept(&mut self, count: u64) {
        self.sessions_swept += count;
    }

    /// Record an activity refresh
    pub fn record_refresh(&mut self) {
        self.activity_refreshes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_recording() {
        let mut stats = SessionStats::new();
        stats.record_created();
        stats.record_evicted();
        stats.record_revoked(2);
        stats.record_swept(3);
        stats.record_refresh();

        assert_eq!(stats.sessions_created, 1);
        assert_eq!(stats.sessions_evicted, 1);
        assert_eq!(stats.sessions_revoked, 3);
        assert_eq!(stats.sessions_swept, 3);
        assert_eq!(stats.activity_refreshes, 1);
        assert!(stats.last_created.is_some());
    }
}
