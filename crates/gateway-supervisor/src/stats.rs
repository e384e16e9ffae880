//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Supervisor statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supervision counters, snapshotted via `Supervisor::get_stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorStats {
    /// Workers spawned, including replacements
    pub workers_spawned: u64,

    /// Workers restarted after a health failure or unexpected exit
    pub workers_restarted: u64,

    /// Workers that exited without the supervisor asking
    pub unexpected_exits: u64,

    /// Health probes that failed
    pub failed_probes: u64,

    /// Health-check cycles completed
    pub health_check_cycles: u64,

    /// Requests dispatched through the balancer
    pub requests_dispatched: u64,

    /// Dispatch attempts with no running worker available
    pub dispatch_failures: u64,

    /// When the last health-check cycle finished
    pub last_health_check: Option<DateTime<Utc>>,
}
