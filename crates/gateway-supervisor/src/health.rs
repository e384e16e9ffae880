//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker health probing and verdicts
//!
//! The supervisor and its workers share no memory; everything it learns
//! about a worker's insides arrives through the worker's internal health
//! endpoint. The probe is also the channel for graceful stop requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::worker::{WorkerInfo, WorkerStatus};

/// What a worker reports about itself when probed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHealthReport {
    /// The worker's own view of its status
    pub status: WorkerStatus,

    /// Resident memory in bytes
    pub memory_usage_bytes: u64,

    /// Requests completed since start
    pub request_count: u64,

    /// Requests that ended in error since start
    pub error_count: u64,
}

/// Why a worker was judged unhealthy
#[derive(Debug, Clone, PartialEq)]
pub enum UnhealthyReason {
    /// Status is not `running`
    NotRunning(WorkerStatus),

    /// Reported memory exceeds the ceiling
    MemoryCeiling { used: u64, ceiling: u64 },

    /// Error rate exceeds the threshold
    ErrorRate { rate: f64, threshold: f64 },

    /// The liveness probe failed outright
    ProbeFailed(String),
}

impl std::fmt::Display for UnhealthyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnhealthyReason::NotRunning(status) => write!(f, "status is {:?}", status),
            UnhealthyReason::MemoryCeiling { used, ceiling } => {
                write!(f, "memory {} exceeds ceiling {}", used, ceiling)
            }
            UnhealthyReason::ErrorRate { rate, threshold } => {
                write!(f, "error rate {:.3} exceeds threshold {:.3}", rate, threshold)
            }
            UnhealthyReason::ProbeFailed(msg) => write!(f, "probe failed: {}", msg),
        }
    }
}

/// Judge a worker whose record has been refreshed from a probe report.
///
/// `None` means healthy. Probe failures never reach this function; the
/// caller turns them into [`UnhealthyReason::ProbeFailed`] directly.
pub fn judge(info: &WorkerInfo, config: &SupervisorConfig) -> Option<UnhealthyReason> {
    if info.status != WorkerStatus::Running {
        return Some(UnhealthyReason::NotRunning(info.status));
    }

    if info.memory_usage_bytes > config.memory_ceiling_bytes {
        return Some(UnhealthyReason::MemoryCeiling {
            used: info.memory_usage_bytes,
            ceiling: config.memory_ceiling_bytes,
        });
    }

    let rate = info.error_rate();
    if rate > config.error_rate_threshold {
        return Some(UnhealthyReason::ErrorRate {
            rate,
            threshold: config.error_rate_threshold,
        });
    }

    None
}

/// Out-of-band worker communication
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Fetch the worker's health report
    async fn probe(&self, port: u16) -> SupervisorResult<WorkerHealthReport>;

    /// Ask the worker to stop gracefully
    async fn request_stop(&self, port: u16) -> SupervisorResult<()>;
}

/// HTTP liveness probe against the worker's internal endpoints
pub struct HttpLivenessProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpLivenessProbe {
    /// Create a probe with the given per-request timeout
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, port: u16) -> SupervisorResult<WorkerHealthReport> {
        let url = format!("http://127.0.0.1:{}/internal/health", port);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SupervisorError::probe(format!("Probe request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SupervisorError::probe(format!(
                "Probe returned {}",
                response.status()
            )));
        }

        response
            .json::<WorkerHealthReport>()
            .await
            .map_err(|e| SupervisorError::probe(format!("Malformed health report: {}", e)))
    }

    async fn request_stop(&self, port: u16) -> SupervisorResult<()> {
        let url = format!("http://127.0.0.1:{}/internal/shutdown", port);
        self.client
            .post(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SupervisorError::signal(format!("Stop request failed: {}", e)))?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpLivenessProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLivenessProbe")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_worker() -> WorkerInfo {
        let mut worker = WorkerInfo::new(0, 8101, Some(100));
        worker.status = WorkerStatus::Running;
        worker
    }

    #[test]
    fn test_healthy_worker_passes() {
        let config = SupervisorConfig::default();
        let mut worker = running_worker();
        worker.memory_usage_bytes = 64 * 1024 * 1024;
        worker.request_count = 1000;
        worker.error_count = 3;

        assert_eq!(judge(&worker, &config), None);
    }

    #[test]
    fn test_not_running_is_unhealthy() {
        let config = SupervisorConfig::default();
        let mut worker = running_worker();
        worker.status = WorkerStatus::Error;

        assert_eq!(
            judge(&worker, &config),
            Some(UnhealthyReason::NotRunning(WorkerStatus::Error))
        );
    }

    #[test]
    fn test_memory_over_ceiling_is_unhealthy() {
        let config = SupervisorConfig::default();
        let mut worker = running_worker();
        worker.memory_usage_bytes = config.memory_ceiling_bytes + 1;

        assert!(matches!(
            judge(&worker, &config),
            Some(UnhealthyReason::MemoryCeiling { .. })
        ));
    }

    #[test]
    fn test_error_rate_over_threshold_is_unhealthy() {
        let mut config = SupervisorConfig::default();
        config.error_rate_threshold = 0.1;
        let mut worker = running_worker();
        worker.request_count = 100;
        worker.error_count = 20;

        assert!(matches!(
            judge(&worker, &config),
            Some(UnhealthyReason::ErrorRate { .. })
        ));

        // No requests yet means a zero error rate, not a division blowup
        worker.request_count = 0;
        worker.error_count = 0;
        assert_eq!(judge(&worker, &config), None);
    }
}
