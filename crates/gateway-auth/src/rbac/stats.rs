//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Evaluation statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Permission evaluation statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationStats {
    /// Number of evaluations performed
    pub evaluations: u64,

    /// Number of allows
    pub allowed: u64,

    /// Number of denies
    pub denied: u64,

    /// Number of results served from cache
    pub cache_hits: u64,

    /// Number of results that required a full scan
    pub cache_misses: u64,

    /// Number of membership lookups that failed and denied a condition
    pub lookup_failures: u64,

    /// Last evaluation
    pub last_evaluation: Option<DateTime<Utc>>,
}

impl EvaluationStats {
    /// Create new evaluation statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an evaluation outcome
    pub fn record_evaluation(&mut self, allowed: bool, from_cache: bool) {
        self.evaluations += 1;
        self.last_evaluation = Some(Utc::now());
        if allowed {
            self.allowed += 1;
        } else {
            self.denied += 1;
        }
        if from_cache {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }

    /// Record a failed membership lookup
    pub fn record_lookup_failure(&mut self) {
        self.lookup_failures += 1;
    }

    /// Share of evaluations that were allowed
    pub fn allow_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.allowed as f64 / self.evaluations as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_stats_recording() {
        let mut stats = EvaluationStats::new();
        assert_eq!(stats.allow_rate(), 0.0);

        stats.record_evaluation(true, false);
        stats.record_evaluation(false, true);
        assert_eq!(stats.evaluations, 2);
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.denied, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.allow_rate(), 0.5);
        assert!(stats.last_evaluation.is_some());

        stats.record_lookup_failure();
        assert_eq!(stats.lookup_failures, 1);
    }
}
