//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker pool supervision and load balancing
//!
//! The supervisor owns a fixed set of worker slots. Each slot holds at
//! most one live process; unhealthy or crashed workers are replaced with
//! a fresh record in the same slot, and requests are dispatched across
//! running workers round-robin.
//!
//! Locking: the slot list itself is only rewritten at startup. Each slot
//! carries two locks — a record lock that is never held across an await,
//! and a process lock held only for process calls. Probes, exit waits,
//! and restart delays run with neither held, so dispatch never waits on
//! a slow or hung worker.

use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::SupervisorConfig;
use crate::error::SupervisorResult;
use crate::health::{judge, LivenessProbe, UnhealthyReason};
use crate::launcher::{WorkerLauncher, WorkerProcess};
use crate::stats::SupervisorStats;
use crate::worker::{WorkerInfo, WorkerStatus};

/// One slot in the pool: the worker record plus its live process handle
struct WorkerSlot {
    info: RwLock<WorkerInfo>,
    process: Mutex<Option<Box<dyn WorkerProcess>>>,
}

/// Supervises the worker pool
pub struct Supervisor {
    config: SupervisorConfig,
    launcher: Arc<dyn WorkerLauncher>,
    probe: Arc<dyn LivenessProbe>,
    slots: RwLock<Vec<Arc<WorkerSlot>>>,
    cursor: AtomicUsize,
    stats: RwLock<SupervisorStats>,
}

impl Supervisor {
    /// Create a supervisor; no workers are spawned until [`start`](Self::start)
    pub fn new(
        config: SupervisorConfig,
        launcher: Arc<dyn WorkerLauncher>,
        probe: Arc<dyn LivenessProbe>,
    ) -> SupervisorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            launcher,
            probe,
            slots: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            stats: RwLock::new(SupervisorStats::default()),
        })
    }

    /// Spawn the full worker pool
    pub async fn start(&self) -> SupervisorResult<()> {
        let mut fresh = Vec::with_capacity(self.config.worker_count);
        for slot in 0..self.config.worker_count {
            let port = self.config.port_for_slot(slot);
            fresh.push(Arc::new(self.spawn_slot(slot, port).await?));
        }
        *self.slots.write().await = fresh;
        info!(worker_count = self.config.worker_count, "Worker pool started");
        Ok(())
    }

    async fn spawn_slot(&self, slot: usize, port: u16) -> SupervisorResult<WorkerSlot> {
        let mut info = WorkerInfo::new(slot, port, None);
        let process = self.launcher.spawn(&info.id, slot, port).await?;
        info.pid = process.pid();

        let mut stats = self.stats.write().await;
        stats.workers_spawned += 1;
        drop(stats);

        debug!(worker_id = %info.id, slot = slot, port = port, "Worker spawned");
        Ok(WorkerSlot {
            info: RwLock::new(info),
            process: Mutex::new(Some(process)),
        })
    }

    /// The slot list; rewritten only by [`start`](Self::start)
    async fn slot_list(&self) -> Vec<Arc<WorkerSlot>> {
        self.slots.read().await.clone()
    }

    /// Pick the next running worker, cycling round-robin.
    ///
    /// Returns `None` when no worker is running.
    pub async fn next_worker(&self) -> Option<WorkerInfo> {
        let slots = self.slot_list().await;
        let mut running = Vec::new();
        for slot in &slots {
            let info = slot.info.read().await;
            if info.status == WorkerStatus::Running {
                running.push(info.clone());
            }
        }

        let mut stats = self.stats.write().await;
        if running.is_empty() {
            stats.dispatch_failures += 1;
            return None;
        }
        stats.requests_dispatched += 1;
        drop(stats);

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % running.len();
        Some(running.swap_remove(idx))
    }

    /// Run one health-check cycle over every slot
    pub async fn run_health_cycle(&self) {
        for slot in self.slot_list().await {
            if let Some(reason) = self.assess_slot(&slot).await {
                let (worker_id, index) = {
                    let info = slot.info.read().await;
                    (info.id.clone(), info.slot)
                };
                warn!(
                    worker_id = %worker_id,
                    slot = index,
                    reason = %reason,
                    "Worker unhealthy, restarting"
                );
                if let Err(e) = self.restart_slot(&slot).await {
                    error!(slot = index, error = %e, "Worker restart failed");
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.health_check_cycles += 1;
        stats.last_health_check = Some(Utc::now());
    }

    /// Assess one slot, refreshing its record from a probe.
    ///
    /// Returns the reason the slot needs a restart, or `None` when it is
    /// healthy or deliberately stopped.
    async fn assess_slot(&self, slot: &WorkerSlot) -> Option<UnhealthyReason> {
        let mut exited = false;
        let mut has_process = false;
        {
            let mut process = slot.process.lock().await;
            if let Some(p) = process.as_mut() {
                has_process = true;
                if p.has_exited().await {
                    exited = true;
                    *process = None;
                }
            }
        }

        if exited {
            let mut info = slot.info.write().await;
            return match info.status {
                WorkerStatus::Stopping | WorkerStatus::Stopped => {
                    info.status = WorkerStatus::Stopped;
                    None
                }
                _ => {
                    info.status = WorkerStatus::Error;
                    drop(info);
                    let mut stats = self.stats.write().await;
                    stats.unexpected_exits += 1;
                    Some(UnhealthyReason::NotRunning(WorkerStatus::Error))
                }
            };
        }

        let snapshot = slot.info.read().await.clone();
        if !has_process && snapshot.status == WorkerStatus::Error {
            // A previous restart attempt failed to spawn; try again
            return Some(UnhealthyReason::NotRunning(WorkerStatus::Error));
        }
        if snapshot.status == WorkerStatus::Stopping || snapshot.status.is_terminal() {
            return None;
        }

        // No locks held while the probe is in flight
        match self.probe.probe(snapshot.port).await {
            Ok(report) => {
                let mut info = slot.info.write().await;
                info.memory_usage_bytes = report.memory_usage_bytes;
                info.request_count = report.request_count;
                info.error_count = report.error_count;
                info.last_health_check = Some(Utc::now());

                if info.status == WorkerStatus::Starting
                    && report.status == WorkerStatus::Running
                {
                    info!(worker_id = %info.id, slot = info.slot, "Worker running");
                    info.status = WorkerStatus::Running;
                }

                if self.in_startup_grace(&info) {
                    return None;
                }
                judge(&info, &self.config)
            }
            Err(e) => {
                let mut stats = self.stats.write().await;
                stats.failed_probes += 1;
                drop(stats);

                if self.in_startup_grace(&snapshot) {
                    debug!(
                        worker_id = %snapshot.id,
                        "Probe failed during startup grace"
                    );
                    return None;
                }
                Some(UnhealthyReason::ProbeFailed(e.to_string()))
            }
        }
    }

    fn in_startup_grace(&self, info: &WorkerInfo) -> bool {
        info.status == WorkerStatus::Starting
            && info.uptime().num_seconds() < self.config.startup_grace_secs as i64
    }

    /// Replace a slot's worker with a fresh one
    async fn restart_slot(&self, slot: &WorkerSlot) -> SupervisorResult<()> {
        self.terminate_slot(slot).await;

        if self.config.restart_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.restart_delay_ms)).await;
        }

        let (index, port) = {
            let info = slot.info.read().await;
            (info.slot, info.port)
        };
        let mut info = WorkerInfo::new(index, port, None);
        match self.launcher.spawn(&info.id, index, port).await {
            Ok(process) => {
                info.pid = process.pid();
                debug!(worker_id = %info.id, slot = index, port = port, "Worker spawned");
                *slot.process.lock().await = Some(process);
                *slot.info.write().await = info;

                let mut stats = self.stats.write().await;
                stats.workers_spawned += 1;
                stats.workers_restarted += 1;
                Ok(())
            }
            Err(e) => {
                slot.info.write().await.status = WorkerStatus::Error;
                Err(e)
            }
        }
    }

    /// Stop a slot's process: graceful request first, kill on timeout
    async fn terminate_slot(&self, slot: &WorkerSlot) {
        let taken = slot.process.lock().await.take();
        let Some(mut process) = taken else {
            let mut info = slot.info.write().await;
            if !info.status.is_terminal() {
                info.status = WorkerStatus::Stopped;
            }
            return;
        };

        let (worker_id, port) = {
            let mut info = slot.info.write().await;
            info.status = WorkerStatus::Stopping;
            (info.id.clone(), info.port)
        };

        if let Err(e) = self.probe.request_stop(port).await {
            debug!(worker_id = %worker_id, error = %e, "Graceful stop request failed");
        }

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        if !process.wait_exit(grace).await {
            warn!(worker_id = %worker_id, "Worker did not exit in time, killing");
            if let Err(e) = process.kill().await {
                error!(worker_id = %worker_id, error = %e, "Failed to kill worker");
            }
        }
        slot.info.write().await.status = WorkerStatus::Stopped;
    }

    /// Stop every worker and leave the pool empty of live processes
    pub async fn shutdown(&self) {
        info!("Stopping worker pool");
        for slot in self.slot_list().await {
            self.terminate_slot(&slot).await;
        }
    }

    /// Run health-check cycles on the configured interval
    pub fn spawn_health_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let supervisor = Arc::clone(self);
        let interval = Duration::from_secs(self.config.health_check_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                supervisor.run_health_cycle().await;
            }
        })
    }

    /// Snapshot every worker record
    pub async fn workers(&self) -> Vec<WorkerInfo> {
        let slots = self.slot_list().await;
        let mut out = Vec::with_capacity(slots.len());
        for slot in &slots {
            out.push(slot.info.read().await.clone());
        }
        out
    }

    /// Whether at least one worker is running
    pub async fn health_check(&self) -> bool {
        for slot in self.slot_list().await {
            if slot.info.read().await.status == WorkerStatus::Running {
                return true;
            }
        }
        false
    }

    /// Get supervision statistics
    pub async fn get_stats(&self) -> SupervisorStats {
        self.stats.read().await.clone()
    }

    /// Get the supervisor configuration
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SupervisorError;
    use crate::health::WorkerHealthReport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockProcessState {
        exited: bool,
        killed: bool,
    }

    struct MockProcess {
        pid: u32,
        state: Arc<StdMutex<MockProcessState>>,
    }

    #[async_trait]
    impl WorkerProcess for MockProcess {
        fn pid(&self) -> Option<u32> {
            Some(self.pid)
        }

        async fn has_exited(&mut self) -> bool {
            let state = self.state.lock().unwrap();
            state.exited || state.killed
        }

        async fn wait_exit(&mut self, _timeout: Duration) -> bool {
            self.state.lock().unwrap().exited = true;
            true
        }

        async fn kill(&mut self) -> SupervisorResult<()> {
            self.state.lock().unwrap().killed = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockLauncher {
        next_pid: AtomicUsize,
        spawned: StdMutex<Vec<Arc<StdMutex<MockProcessState>>>>,
    }

    #[async_trait]
    impl WorkerLauncher for MockLauncher {
        async fn spawn(
            &self,
            _worker_id: &str,
            _slot: usize,
            _port: u16,
        ) -> SupervisorResult<Box<dyn WorkerProcess>> {
            let state = Arc::new(StdMutex::new(MockProcessState::default()));
            self.spawned.lock().unwrap().push(Arc::clone(&state));
            let pid = 1000 + self.next_pid.fetch_add(1, Ordering::Relaxed) as u32;
            Ok(Box::new(MockProcess { pid, state }))
        }
    }

    #[derive(Default)]
    struct MockProbe {
        reports: StdMutex<HashMap<u16, WorkerHealthReport>>,
        stop_requests: StdMutex<Vec<u16>>,
        delay: StdMutex<Duration>,
    }

    impl MockProbe {
        fn set_report(&self, port: u16, report: WorkerHealthReport) {
            self.reports.lock().unwrap().insert(port, report);
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        fn running_report() -> WorkerHealthReport {
            WorkerHealthReport {
                status: WorkerStatus::Running,
                memory_usage_bytes: 32 * 1024 * 1024,
                request_count: 10,
                error_count: 0,
            }
        }
    }

    #[async_trait]
    impl LivenessProbe for MockProbe {
        async fn probe(&self, port: u16) -> SupervisorResult<WorkerHealthReport> {
            let delay = *self.delay.lock().unwrap();
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            self.reports
                .lock()
                .unwrap()
                .get(&port)
                .cloned()
                .ok_or_else(|| SupervisorError::probe("connection refused".to_string()))
        }

        async fn request_stop(&self, port: u16) -> SupervisorResult<()> {
            self.stop_requests.lock().unwrap().push(port);
            Ok(())
        }
    }

    fn test_config() -> SupervisorConfig {
        SupervisorConfig {
            worker_count: 3,
            restart_delay_ms: 0,
            startup_grace_secs: 0,
            shutdown_grace_secs: 1,
            ..Default::default()
        }
    }

    fn build(
        config: SupervisorConfig,
    ) -> (Supervisor, Arc<MockLauncher>, Arc<MockProbe>) {
        let launcher = Arc::new(MockLauncher::default());
        let probe = Arc::new(MockProbe::default());
        let supervisor = Supervisor::new(
            config,
            Arc::clone(&launcher) as Arc<dyn WorkerLauncher>,
            Arc::clone(&probe) as Arc<dyn LivenessProbe>,
        )
        .unwrap();
        (supervisor, launcher, probe)
    }

    #[tokio::test]
    async fn test_start_spawns_all_slots() {
        let (supervisor, launcher, _probe) = build(test_config());
        supervisor.start().await.unwrap();

        let workers = supervisor.workers().await;
        assert_eq!(workers.len(), 3);
        assert!(workers.iter().all(|w| w.status == WorkerStatus::Starting));
        assert_eq!(workers[0].port, 8101);
        assert_eq!(workers[2].port, 8103);
        assert_eq!(launcher.spawned.lock().unwrap().len(), 3);

        let stats = supervisor.get_stats().await;
        assert_eq!(stats.workers_spawned, 3);
    }

    #[tokio::test]
    async fn test_probe_promotes_starting_to_running() {
        let (supervisor, _launcher, probe) = build(test_config());
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }

        supervisor.run_health_cycle().await;

        let workers = supervisor.workers().await;
        assert!(workers.iter().all(|w| w.status == WorkerStatus::Running));
        assert!(workers.iter().all(|w| w.last_health_check.is_some()));
        assert_eq!(workers[0].request_count, 10);
    }

    #[tokio::test]
    async fn test_round_robin_cycles_running_workers() {
        let (supervisor, _launcher, probe) = build(test_config());
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }
        supervisor.run_health_cycle().await;

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            seen.insert(supervisor.next_worker().await.unwrap().port);
        }
        assert_eq!(seen.len(), 3);

        // Fourth pick wraps around
        let again = supervisor.next_worker().await.unwrap();
        assert!(seen.contains(&again.port));

        let stats = supervisor.get_stats().await;
        assert_eq!(stats.requests_dispatched, 4);
    }

    #[tokio::test]
    async fn test_next_worker_none_when_nothing_running() {
        let (supervisor, _launcher, _probe) = build(test_config());
        supervisor.start().await.unwrap();

        // All workers are still starting
        assert!(supervisor.next_worker().await.is_none());
        let stats = supervisor.get_stats().await;
        assert_eq!(stats.dispatch_failures, 1);
    }

    #[tokio::test]
    async fn test_memory_over_ceiling_replaces_worker() {
        let (supervisor, _launcher, probe) = build(test_config());
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }
        supervisor.run_health_cycle().await;
        let fat_id = supervisor.workers().await[1].id.clone();

        let mut fat = MockProbe::running_report();
        fat.memory_usage_bytes = 2 * 1024 * 1024 * 1024;
        fat.request_count = 5000;
        probe.set_report(8102, fat);

        supervisor.run_health_cycle().await;

        let workers = supervisor.workers().await;
        let replacement = &workers[1];
        assert_ne!(replacement.id, fat_id);
        assert_eq!(replacement.slot, 1);
        assert_eq!(replacement.port, 8102);
        assert_eq!(replacement.status, WorkerStatus::Starting);
        assert_eq!(replacement.request_count, 0);

        let stats = supervisor.get_stats().await;
        assert_eq!(stats.workers_restarted, 1);
        assert_eq!(stats.workers_spawned, 4);
        assert!(probe.stop_requests.lock().unwrap().contains(&8102));
    }

    #[tokio::test]
    async fn test_unexpected_exit_restarts_worker() {
        let (supervisor, launcher, probe) = build(test_config());
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }
        supervisor.run_health_cycle().await;
        let old_id = supervisor.workers().await[0].id.clone();

        // Simulate a crash of slot 0
        launcher.spawned.lock().unwrap()[0].lock().unwrap().exited = true;

        supervisor.run_health_cycle().await;

        let workers = supervisor.workers().await;
        assert_ne!(workers[0].id, old_id);
        assert_eq!(workers[0].status, WorkerStatus::Starting);

        let stats = supervisor.get_stats().await;
        assert_eq!(stats.unexpected_exits, 1);
        assert_eq!(stats.workers_restarted, 1);
    }

    #[tokio::test]
    async fn test_failed_probe_restarts_after_grace() {
        let (supervisor, _launcher, probe) = build(test_config());
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }
        supervisor.run_health_cycle().await;

        // Slot 2 stops answering probes
        probe.reports.lock().unwrap().remove(&8103);
        supervisor.run_health_cycle().await;

        let workers = supervisor.workers().await;
        assert_eq!(workers[2].status, WorkerStatus::Starting);

        let stats = supervisor.get_stats().await;
        assert_eq!(stats.failed_probes, 1);
        assert_eq!(stats.workers_restarted, 1);
    }

    #[tokio::test]
    async fn test_failed_probe_tolerated_during_startup_grace() {
        let mut config = test_config();
        config.startup_grace_secs = 3600;
        let (supervisor, _launcher, _probe) = build(config);
        supervisor.start().await.unwrap();

        // No reports registered, every probe fails
        supervisor.run_health_cycle().await;

        let workers = supervisor.workers().await;
        assert!(workers.iter().all(|w| w.status == WorkerStatus::Starting));

        let stats = supervisor.get_stats().await;
        assert_eq!(stats.failed_probes, 3);
        assert_eq!(stats.workers_restarted, 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_without_restarting() {
        let (supervisor, _launcher, probe) = build(test_config());
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }
        supervisor.run_health_cycle().await;

        supervisor.shutdown().await;

        let workers = supervisor.workers().await;
        assert!(workers.iter().all(|w| w.status == WorkerStatus::Stopped));
        assert_eq!(probe.stop_requests.lock().unwrap().len(), 3);
        assert!(!supervisor.health_check().await);

        // A later cycle must not resurrect anything
        supervisor.run_health_cycle().await;
        let stats = supervisor.get_stats().await;
        assert_eq!(stats.workers_restarted, 0);
        assert_eq!(supervisor.workers().await.len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_not_blocked_by_slow_probes() {
        let (supervisor, _launcher, probe) = build(test_config());
        let supervisor = Arc::new(supervisor);
        supervisor.start().await.unwrap();
        for port in 8101..=8103 {
            probe.set_report(port, MockProbe::running_report());
        }
        supervisor.run_health_cycle().await;

        // Every probe now takes 150ms, so the cycle runs ~450ms
        probe.set_delay(Duration::from_millis(150));
        let cycle = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.run_health_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = std::time::Instant::now();
        assert!(supervisor.next_worker().await.is_some());
        assert!(
            started.elapsed() < Duration::from_millis(100),
            "dispatch waited on the health cycle"
        );
        assert!(!supervisor.workers().await.is_empty());

        cycle.await.unwrap();
    }
}
