//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Token statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Token statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenStats {
    /// Access tokens issued
    pub access_tokens_issued: u64,

    /// Refresh tokens issued
    pub refresh_tokens_issued: u64,

    /// Successful validations
    pub validations_succeeded: u64,

    /// Failed validations
    pub validations_failed: u64,

    /// Last token issuance
    pub last_issued: Option<DateTime<Utc>>,
}

impl TokenStats {
    /// Create new token statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access token issuance
    pub fn record_access_issued(&mut self) {
        self.access_tokens_issued += 1;
        self.last_issued = Some(Utc::now());
    }

    /// Record a refresh token issuance
    pub fn record_refresh_issued(&mut self) {
        self.refresh_tokens_issued += 1;
        self.last_issued = Some(Utc::now());
    }

    /// Record a validation outcome
    pub fn record_validation(&mut self, succeeded: bool) {
        if succeeded {
            self.validations_succeeded += 1;
        } else {
            self.validations_failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_stats_recording() {
        let mut stats = TokenStats::new();
        stats.record_access_issued();
        stats.record_refresh_issued();
        stats.record_validation(true);
        stats.record_validation(false);

        assert_eq!(stats.access_tokens_issued, 1);
        assert_eq!(stats.refresh_tokens_issued, 1);
        assert_eq!(stats.validations_succeeded, 1);
        assert_eq!(stats.validations_failed, 1);
        assert!(stats.last_issued.is_some());
    }
}
