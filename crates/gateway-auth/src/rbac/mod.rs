//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role-based access control

pub mod cache;
pub mod context;
pub mod evaluator;
pub mod membership;
pub mod model;
pub mod stats;

// Re-export commonly used types
pub use cache::PermissionCache;
pub use context::{ResourceRef, SecurityContext, UserRef};
pub use evaluator::PermissionEvaluator;
pub use membership::{MembershipLookup, MemoryMembershipDirectory};
pub use model::{Condition, Permission, Role, RoleRegistry, WILDCARD};
pub use stats::EvaluationStats;
