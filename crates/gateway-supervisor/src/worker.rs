//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker records and the status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Worker lifecycle status.
///
/// `starting → running → {stopping → stopped | error}`. A worker in
/// `error`, or one that exits without the supervisor asking, is replaced;
/// a worker the supervisor stopped lands in `stopped` and stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Process spawned, listener not yet confirmed
    Starting,

    /// Serving requests
    Running,

    /// Asked to stop, exit pending
    Stopping,

    /// Exited at the supervisor's request
    Stopped,

    /// Failed or exited unexpectedly
    Error,
}

impl WorkerStatus {
    /// Whether the worker has left the pool for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerStatus::Stopped | WorkerStatus::Error)
    }
}

/// One worker process as the supervisor sees it.
///
/// Restarting a slot creates a fresh record with a new id and zeroed
/// counters; records are never resurrected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInfo {
    /// Worker id, unique per spawn
    pub id: String,

    /// Slot index; stable across restarts
    pub slot: usize,

    /// OS process id, when known
    pub pid: Option<u32>,

    /// Listening port
    pub port: u16,

    /// Lifecycle status
    pub status: WorkerStatus,

    /// When the process was spawned
    pub start_time: DateTime<Utc>,

    /// Last successful health probe
    pub last_health_check: Option<DateTime<Utc>>,

    /// Last reported memory usage in bytes
    pub memory_usage_bytes: u64,

    /// Requests completed, as reported by the worker
    pub request_count: u64,

    /// Requests that ended in error, as reported by the worker
    pub error_count: u64,
}

impl WorkerInfo {
    /// Create a record for a freshly spawned worker
    pub fn new(slot: usize, port: u16, pid: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            slot,
            pid,
            port,
            status: WorkerStatus::Starting,
            start_time: Utc::now(),
            last_health_check: None,
            memory_usage_bytes: 0,
            request_count: 0,
            error_count: 0,
        }
    }

    /// Error rate over completed requests; 0 when none have completed
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.request_count as f64
        }
    }

    /// How long the process has been up
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_worker_starts_clean() {
        let worker = WorkerInfo::new(2, 8103, Some(4242));
        assert_eq!(worker.slot, 2);
        assert_eq!(worker.port, 8103);
        assert_eq!(worker.status, WorkerStatus::Starting);
        assert_eq!(worker.request_count, 0);
        assert_eq!(worker.error_count, 0);
        assert!(worker.last_health_check.is_none());
    }

    #[test]
    fn test_error_rate() {
        let mut worker = WorkerInfo::new(0, 8101, None);
        assert_eq!(worker.error_rate(), 0.0);

        worker.request_count = 200;
        worker.error_count = 10;
        assert!((worker.error_rate() - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!WorkerStatus::Starting.is_terminal());
        assert!(!WorkerStatus::Running.is_terminal());
        assert!(!WorkerStatus::Stopping.is_terminal());
        assert!(WorkerStatus::Stopped.is_terminal());
        assert!(WorkerStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&WorkerStatus::Running).unwrap(),
            "\"running\""
        );
        let status: WorkerStatus = serde_json::from_str("\"stopping\"").unwrap();
        assert_eq!(status, WorkerStatus::Stopping);
    }
}
