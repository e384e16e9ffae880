//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker-process supervision and load balancing for the Palisade gateway
//!
//! This crate keeps a fixed pool of worker processes alive: it spawns
//! them, probes their health on an interval, replaces the ones that
//! crash, leak memory, or error too often, and hands out running workers
//! round-robin for request dispatch.
//!
//! ```rust,no_run
//! use gateway_supervisor::{
//!     HttpLivenessProbe, ProcessLauncher, Supervisor, SupervisorConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SupervisorConfig::default();
//!     let launcher = Arc::new(ProcessLauncher::new("./palisade-gateway".to_string()));
//!     let probe = Arc::new(HttpLivenessProbe::new(config.probe_timeout_secs));
//!     let supervisor = Arc::new(Supervisor::new(config, launcher, probe)?);
//!
//!     supervisor.start().await?;
//!     let _health_loop = supervisor.spawn_health_loop();
//!
//!     if let Some(worker) = supervisor.next_worker().await {
//!         println!("dispatching to port {}", worker.port);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod launcher;
pub mod stats;
pub mod supervisor;
pub mod worker;

// Re-export commonly used types
pub use config::SupervisorConfig;
pub use error::{SupervisorError, SupervisorResult};
pub use health::{HttpLivenessProbe, LivenessProbe, UnhealthyReason, WorkerHealthReport};
pub use launcher::{
    ProcessLauncher, WorkerLauncher, WorkerProcess, ENV_ROLE, ENV_WORKER_ID, ENV_WORKER_PORT,
    ENV_WORKER_SLOT,
};
pub use stats::SupervisorStats;
pub use supervisor::Supervisor;
pub use worker::{WorkerInfo, WorkerStatus};

/// Default number of worker slots
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default seconds between health-check cycles
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

/// Default per-worker memory ceiling in bytes
pub const DEFAULT_MEMORY_CEILING_BYTES: u64 = 512 * 1024 * 1024;

/// Default error-rate threshold
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 0.5;

/// Default milliseconds between stopping an unhealthy worker and
/// spawning its replacement
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1000;

/// Supervisor crate version
pub const SUPERVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");
