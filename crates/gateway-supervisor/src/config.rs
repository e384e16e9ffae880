//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Supervisor configuration

use serde::{Deserialize, Serialize};

/// Supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Number of worker slots
    pub worker_count: usize,

    /// First worker port; slot N listens on `base_port + N`
    pub base_port: u16,

    /// Program to spawn per worker; the gateway binary re-executes itself
    /// when this is unset
    #[serde(default)]
    pub worker_program: Option<String>,

    /// Seconds between health-check cycles
    pub health_check_interval_secs: u64,

    /// Seconds a freshly spawned worker may stay `starting` before failed
    /// probes count against it
    pub startup_grace_secs: u64,

    /// Memory ceiling per worker in bytes
    pub memory_ceiling_bytes: u64,

    /// Error rate (errors / requests) above which a worker is unhealthy
    pub error_rate_threshold: f64,

    /// Milliseconds between terminating an unhealthy worker and spawning
    /// its replacement
    pub restart_delay_ms: u64,

    /// Liveness probe timeout in seconds
    pub probe_timeout_secs: u64,

    /// Seconds a stopping worker gets to exit before it is killed
    pub shutdown_grace_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_count: crate::DEFAULT_WORKER_COUNT,
            base_port: 8101,
            worker_program: None,
            health_check_interval_secs: crate::DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            startup_grace_secs: 10,
            memory_ceiling_bytes: crate::DEFAULT_MEMORY_CEILING_BYTES,
            error_rate_threshold: crate::DEFAULT_ERROR_RATE_THRESHOLD,
            restart_delay_ms: crate::DEFAULT_RESTART_DELAY_MS,
            probe_timeout_secs: 5,
            shutdown_grace_secs: 10,
        }
    }
}

impl SupervisorConfig {
    /// Validate the supervisor configuration
    pub fn validate(&self) -> crate::SupervisorResult<()> {
        if self.worker_count == 0 {
            return Err(crate::SupervisorError::config(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.base_port as usize + self.worker_count > u16::MAX as usize {
            return Err(crate::SupervisorError::config(
                "worker ports exceed the port range".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.error_rate_threshold) {
            return Err(crate::SupervisorError::config(
                "error_rate_threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The port assigned to a worker slot
    pub fn port_for_slot(&self, slot: usize) -> u16 {
        self.base_port + slot as u16
    }
}
