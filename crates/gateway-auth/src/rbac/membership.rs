//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Membership lookup collaborator
//!
//! Classroom and dependent membership live outside this crate. Condition
//! evaluation reaches them through this seam; a lookup failure is treated
//! as condition-not-met by the evaluator, never as an error.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AuthResult;

/// Classroom and dependent membership queries
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    /// Whether the user is a member of the classroom
    async fn is_classroom_member(&self, user_id: &str, classroom_id: &str) -> AuthResult<bool>;

    /// Whether the user is the classroom's primary owner
    async fn is_classroom_owner(&self, user_id: &str, classroom_id: &str) -> AuthResult<bool>;

    /// Whether any dependent of the user is a member of the classroom
    async fn has_child_in_classroom(&self, user_id: &str, classroom_id: &str) -> AuthResult<bool>;
}

/// In-memory membership directory.
///
/// Backs single-process deployments and tests; production deployments
/// implement [`MembershipLookup`] over their own data store.
#[derive(Debug, Default)]
pub struct MemoryMembershipDirectory {
    /// Classroom id to member user ids
    members: Arc<RwLock<HashMap<String, HashSet<String>>>>,

    /// Classroom id to primary owner user id
    owners: Arc<RwLock<HashMap<String, String>>>,

    /// Guardian user id to dependent user ids
    children: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl MemoryMembershipDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to a classroom
    pub async fn add_member(&self, classroom_id: &str, user_id: &str) {
        let mut members = self.members.write().await;
        members
            .entry(classroom_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    /// Remove a user from a classroom
    pub async fn remove_member(&self, classroom_id: &str, user_id: &str) {
        let mut members = self.members.write().await;
        if let Some(set) = members.get_mut(classroom_id) {
            set.remove(user_id);
        }
    }

    /// Set the classroom's primary owner
    pub async fn set_owner(&self, classroom_id: &str, user_id: &str) {
        let mut owners = self.owners.write().await;
        owners.insert(classroom_id.to_string(), user_id.to_string());
    }

    /// Register a dependent of a guardian
    pub async fn add_child(&self, guardian_id: &str, child_id: &str) {
        let mut children = self.children.write().await;
        children
            .entry(guardian_id.to_string())
            .or_default()
            .push(child_id.to_string());
    }
}

#[async_trait]
impl MembershipLookup for MemoryMembershipDirectory {
    async fn is_classroom_member(&self, user_id: &str, classroom_id: &str) -> AuthResult<bool> {
        let members = self.members.read().await;
        Ok(members
            .get(classroom_id)
            .map(|set| set.contains(user_id))
            .unwrap_or(false))
    }

    async fn is_classroom_owner(&self, user_id: &str, classroom_id: &str) -> AuthResult<bool> {
        let owners = self.owners.read().await;
        Ok(owners
            .get(classroom_id)
            .map(|owner| owner == user_id)
            .unwrap_or(false))
    }

    async fn has_child_in_classroom(&self, user_id: &str, classroom_id: &str) -> AuthResult<bool> {
        let children = self.children.read().await;
        let Some(dependents) = children.get(user_id) else {
            return Ok(false);
        };

        let members = self.members.read().await;
        let Some(set) = members.get(classroom_id) else {
            return Ok(false);
        };

        Ok(dependents.iter().any(|child| set.contains(child)))
    }
}
