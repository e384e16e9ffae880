//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker self-metrics
//!
//! Each worker counts its own traffic and samples its own memory; the
//! supervisor reads the result through the internal health endpoint and
//! makes every restart decision from it.

use axum::http::StatusCode;
use gateway_supervisor::{WorkerHealthReport, WorkerStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use sysinfo::{Pid, System};

/// Per-worker traffic counters and memory sampling
pub struct WorkerMetrics {
    requests: AtomicU64,
    errors: AtomicU64,
    status: Mutex<WorkerStatus>,
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl WorkerMetrics {
    /// Create metrics for the current process
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            status: Mutex::new(WorkerStatus::Running),
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Record one completed request; 5xx responses count as errors
    pub fn record_request(&self, status: StatusCode) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if status.is_server_error() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Update the status the worker reports about itself
    pub fn set_status(&self, status: WorkerStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Sample memory usage of this process in bytes
    fn sample_memory(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = self.system.lock().unwrap();
        system.refresh_process(pid);
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }

    /// Snapshot the report the health endpoint serves
    pub fn report(&self) -> WorkerHealthReport {
        WorkerHealthReport {
            status: *self.status.lock().unwrap(),
            memory_usage_bytes: self.sample_memory(),
            request_count: self.requests.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorkerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerMetrics")
            .field("requests", &self.requests.load(Ordering::Relaxed))
            .field("errors", &self.errors.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_requests_and_server_errors() {
        let metrics = WorkerMetrics::new();
        metrics.record_request(StatusCode::OK);
        metrics.record_request(StatusCode::NOT_FOUND);
        metrics.record_request(StatusCode::INTERNAL_SERVER_ERROR);

        let report = metrics.report();
        assert_eq!(report.request_count, 3);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.status, WorkerStatus::Running);
    }

    #[test]
    fn test_status_transition_is_reported() {
        let metrics = WorkerMetrics::new();
        metrics.set_status(WorkerStatus::Stopping);
        assert_eq!(metrics.report().status, WorkerStatus::Stopping);
    }

    #[test]
    fn test_memory_sample_for_own_process() {
        let metrics = WorkerMetrics::new();
        // The test process itself must show nonzero resident memory
        assert!(metrics.report().memory_usage_bytes > 0);
    }
}
