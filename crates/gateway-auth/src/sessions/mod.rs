//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Session management

pub mod manager;
pub mod model;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use manager::SessionManager;
pub use model::{RequestMeta, Session};
pub use stats::SessionStats;
pub use store::{MemorySessionStore, RedisSessionStore, SessionStore};
