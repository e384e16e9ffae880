//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission evaluation
//!
//! Evaluation is a pure function of the role table, the security context,
//! and the requested (resource, action, resource id), fronted by a short
//! TTL result cache. An unknown role denies; the reserved super-admin role
//! allows before any scan. Inherited roles are scanned one level deep, in
//! listed order, after the role's own permissions.

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::AuthResult;
use crate::rbac::cache::PermissionCache;
use crate::rbac::context::SecurityContext;
use crate::rbac::membership::MembershipLookup;
use crate::rbac::model::{Condition, Role, RoleRegistry};
use crate::rbac::stats::EvaluationStats;

/// Permission evaluator
pub struct PermissionEvaluator {
    /// Static role table
    registry: Arc<RoleRegistry>,

    /// Membership collaborator for condition checks
    membership: Arc<dyn MembershipLookup>,

    /// Result cache
    cache: PermissionCache,

    /// Statistics
    stats: Arc<RwLock<EvaluationStats>>,
}

impl PermissionEvaluator {
    /// Create a new evaluator
    pub fn new(
        registry: Arc<RoleRegistry>,
        membership: Arc<dyn MembershipLookup>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            membership,
            cache: PermissionCache::new(cache_ttl),
            stats: Arc::new(RwLock::new(EvaluationStats::new())),
        }
    }

    /// Decide whether the context's user may perform `action` on `resource`.
    ///
    /// Never fails: unknown roles and failed membership lookups deny.
    pub async fn evaluate(
        &self,
        context: &SecurityContext,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
    ) -> bool {
        // Super admin bypasses the scan and the cache entirely
        if self.registry.is_super_admin(&context.user.role) {
            let mut stats = self.stats.write().await;
            stats.record_evaluation(true, false);
            return true;
        }

        if let Some(cached) = self
            .cache
            .get(&context.user.id, resource, action, resource_id)
            .await
        {
            let mut stats = self.stats.write().await;
            stats.record_evaluation(cached, true);
            return cached;
        }

        let allowed = self
            .evaluate_uncached(context, resource, action, resource_id)
            .await;

        self.cache
            .insert(&context.user.id, resource, action, resource_id, allowed)
            .await;

        {
            let mut stats = self.stats.write().await;
            stats.record_evaluation(allowed, false);
        }

        if !allowed {
            debug!(
                user_id = %context.user.id,
                role = %context.user.role,
                resource = %resource,
                action = %action,
                "Permission denied"
            );
        }

        allowed
    }

    async fn evaluate_uncached(
        &self,
        context: &SecurityContext,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
    ) -> bool {
        let Some(role) = self.registry.get(&context.user.role) else {
            debug!(role = %context.user.role, "Unknown role, denying");
            return false;
        };

        if self
            .role_grants(role, context, resource, action, resource_id)
            .await
        {
            return true;
        }

        // One level of inheritance, in listed order
        for parent_name in &role.inherits {
            let Some(parent) = self.registry.get(parent_name) else {
                debug!(role = %parent_name, "Inherited role missing from table, skipping");
                continue;
            };
            if self
                .role_grants(parent, context, resource, action, resource_id)
                .await
            {
                return true;
            }
        }

        false
    }

    /// Scan one role's own permissions in declaration order
    async fn role_grants(
        &self,
        role: &Role,
        context: &SecurityContext,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
    ) -> bool {
        for permission in &role.permissions {
            if !permission.matches(resource, action) {
                continue;
            }
            if permission.conditions.is_empty() {
                return true;
            }
            if self
                .conditions_hold(&permission.conditions, context, resource_id)
                .await
            {
                return true;
            }
        }
        false
    }

    /// All conditions must hold (conjunction)
    async fn conditions_hold(
        &self,
        conditions: &[Condition],
        context: &SecurityContext,
        resource_id: Option<&str>,
    ) -> bool {
        for &condition in conditions {
            if !self.condition_holds(condition, context, resource_id).await {
                return false;
            }
        }
        true
    }

    async fn condition_holds(
        &self,
        condition: Condition,
        context: &SecurityContext,
        resource_id: Option<&str>,
    ) -> bool {
        match condition {
            Condition::Owner => context
                .resource
                .as_ref()
                .map(|resource| resource.owner_id == context.user.id)
                .unwrap_or(false),
            Condition::ClassroomMember => {
                let Some(classroom_id) = resource_id else {
                    return false;
                };
                self.lookup_outcome(
                    self.membership
                        .is_classroom_member(&context.user.id, classroom_id)
                        .await,
                )
                .await
            }
            Condition::ClassroomOwner => {
                let Some(classroom_id) = resource_id else {
                    return false;
                };
                self.lookup_outcome(
                    self.membership
                        .is_classroom_owner(&context.user.id, classroom_id)
                        .await,
                )
                .await
            }
            Condition::ChildMember => {
                let Some(classroom_id) = resource_id else {
                    return false;
                };
                self.lookup_outcome(
                    self.membership
                        .has_child_in_classroom(&context.user.id, classroom_id)
                        .await,
                )
                .await
            }
            Condition::OwnGrades => true,
        }
    }

    /// A failed lookup is condition-not-met, never an error
    async fn lookup_outcome(&self, outcome: AuthResult<bool>) -> bool {
        match outcome {
            Ok(holds) => holds,
            Err(err) => {
                warn!("Membership lookup failed, denying condition: {}", err);
                let mut stats = self.stats.write().await;
                stats.record_lookup_failure();
                false
            }
        }
    }

    /// Drop cached results for one user (role or membership change)
    pub async fn invalidate_user(&self, user_id: &str) {
        self.cache.invalidate_user(user_id).await;
    }

    /// Drop every cached result (bulk changes)
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Remove expired cache entries
    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }

    /// Number of cached results
    pub async fn cache_size(&self) -> usize {
        self.cache.len().await
    }

    /// Get evaluation statistics
    pub async fn get_stats(&self) -> EvaluationStats {
        self.stats.read().await.clone()
    }
}

impl std::fmt::Debug for PermissionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEvaluator")
            .field("roles", &self.registry.len())
            .finish()
    }
}
