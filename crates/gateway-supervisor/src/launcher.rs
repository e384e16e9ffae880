//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker process launching seam
//!
//! The supervisor drives worker processes through these traits so the
//! lifecycle logic is testable without forking anything. The production
//! launcher spawns OS processes with tokio; the worker learns its
//! identity and port from environment variables.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{SupervisorError, SupervisorResult};

/// Environment variable carrying the worker's role
pub const ENV_ROLE: &str = "PALISADE_ROLE";

/// Environment variable carrying the worker's id
pub const ENV_WORKER_ID: &str = "PALISADE_WORKER_ID";

/// Environment variable carrying the worker's slot index
pub const ENV_WORKER_SLOT: &str = "PALISADE_WORKER_SLOT";

/// Environment variable carrying the worker's listening port
pub const ENV_WORKER_PORT: &str = "PALISADE_WORKER_PORT";

/// A live worker process under supervision
#[async_trait]
pub trait WorkerProcess: Send + Sync {
    /// OS process id, when the process is (or was) alive
    fn pid(&self) -> Option<u32>;

    /// Whether the process has exited; does not block
    async fn has_exited(&mut self) -> bool;

    /// Wait up to `timeout` for the process to exit on its own
    async fn wait_exit(&mut self, timeout: Duration) -> bool;

    /// Kill the process outright
    async fn kill(&mut self) -> SupervisorResult<()>;
}

/// Spawns worker processes
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Spawn the worker for a slot, listening on the given port
    async fn spawn(
        &self,
        worker_id: &str,
        slot: usize,
        port: u16,
    ) -> SupervisorResult<Box<dyn WorkerProcess>>;
}

/// OS process launcher
pub struct ProcessLauncher {
    /// Program to execute per worker
    program: String,
}

impl ProcessLauncher {
    /// Create a launcher for the given program
    pub fn new(program: String) -> Self {
        Self { program }
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn spawn(
        &self,
        worker_id: &str,
        slot: usize,
        port: u16,
    ) -> SupervisorResult<Box<dyn WorkerProcess>> {
        let child = tokio::process::Command::new(&self.program)
            .env(ENV_ROLE, "worker")
            .env(ENV_WORKER_ID, worker_id)
            .env(ENV_WORKER_SLOT, slot.to_string())
            .env(ENV_WORKER_PORT, port.to_string())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SupervisorError::spawn(format!("Failed to spawn {}: {}", self.program, e))
            })?;

        debug!(
            worker_id = %worker_id,
            slot = slot,
            port = port,
            pid = ?child.id(),
            "Worker process spawned"
        );
        Ok(Box::new(ChildProcess { child }))
    }
}

impl std::fmt::Debug for ProcessLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessLauncher")
            .field("program", &self.program)
            .finish()
    }
}

/// A spawned OS child process
struct ChildProcess {
    child: tokio::process::Child,
}

#[async_trait]
impl WorkerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    async fn wait_exit(&mut self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.child.wait())
            .await
            .is_ok()
    }

    async fn kill(&mut self) -> SupervisorResult<()> {
        self.child
            .kill()
            .await
            .map_err(|e| SupervisorError::signal(format!("Failed to kill worker: {}", e)))
    }
}
