//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! User and credential management

pub mod manager;
pub mod model;
pub mod password;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use manager::UserManager;
pub use model::{AccountStatus, User};
pub use stats::UserStats;
pub use store::{MemoryUserStore, UserStore};
