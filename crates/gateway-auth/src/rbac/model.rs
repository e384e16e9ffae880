//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role and permission definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wildcard matching any resource or action
pub const WILDCARD: &str = "*";

/// A role: a named set of permissions plus directly inherited roles.
///
/// Roles are static configuration. They are loaded once into a
/// [`RoleRegistry`] and never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Role name, unique within the role table
    pub name: String,

    /// Permissions granted directly by this role, scanned in declaration order
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Roles whose permissions this role also receives (one level, not recursive)
    #[serde(default)]
    pub inherits: Vec<String>,
}

/// A single grant of an action on a resource, optionally gated by conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Resource name or `*`
    pub resource: String,

    /// Action name or `*`
    pub action: String,

    /// Conditions that must all hold for the grant to apply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Permission {
    /// Unconditional grant
    pub fn new(resource: &str, action: &str) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            conditions: Vec::new(),
        }
    }

    /// Grant gated by conditions
    pub fn with_conditions(resource: &str, action: &str, conditions: Vec<Condition>) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            conditions,
        }
    }

    /// Whether this permission covers the requested resource and action
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        (self.resource == WILDCARD || self.resource == resource)
            && (self.action == WILDCARD || self.action == action)
    }

    /// Permission string representation (resource:action)
    pub fn permission_string(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

/// The closed set of permission conditions.
///
/// Every variant is evaluated against the security context and the
/// resource identifier in scope; there is no runtime extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The resource under test is owned by the requesting user
    Owner,

    /// The requesting user is a member of the classroom in scope
    #[serde(alias = "member")]
    ClassroomMember,

    /// The requesting user is the classroom's primary owner
    ClassroomOwner,

    /// A dependent of the requesting user is a member of the classroom in scope
    #[serde(alias = "child_grades")]
    ChildMember,

    /// Always holds here; row scoping is the data-access layer's job
    OwnGrades,
}

/// Read-only lookup table of roles keyed by name.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: HashMap<String, Role>,
    super_admin_role: String,
}

impl RoleRegistry {
    /// Build a registry from a role table
    pub fn new(roles: Vec<Role>, super_admin_role: String) -> Self {
        let roles = roles
            .into_iter()
            .map(|role| (role.name.clone(), role))
            .collect();
        Self {
            roles,
            super_admin_role,
        }
    }

    /// Look up a role by name
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Whether the given role name is the reserved super-admin marker
    pub fn is_super_admin(&self, name: &str) -> bool {
        name == self.super_admin_role
    }

    /// Number of configured roles
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Role {
    /// Built-in role table for the school platform.
    ///
    /// Serves as the default when no role table is configured; deployments
    /// override it wholesale through configuration.
    pub fn default_roles() -> Vec<Role> {
        vec![
            Role {
                name: crate::SUPER_ADMIN_ROLE.to_string(),
                permissions: Vec::new(),
                inherits: Vec::new(),
            },
            Role {
                name: "admin".to_string(),
                permissions: vec![Permission::new(WILDCARD, WILDCARD)],
                inherits: Vec::new(),
            },
            Role {
                name: "teacher".to_string(),
                permissions: vec![
                    Permission::with_conditions(
                        "classroom",
                        "read",
                        vec![Condition::ClassroomMember],
                    ),
                    Permission::with_conditions(
                        "classroom",
                        "manage",
                        vec![Condition::ClassroomOwner],
                    ),
                    Permission::with_conditions(
                        "grades",
                        "read",
                        vec![Condition::ClassroomMember],
                    ),
                    Permission::with_conditions(
                        "grades",
                        "write",
                        vec![Condition::ClassroomOwner],
                    ),
                    Permission::new("documents", "create"),
                ],
                inherits: Vec::new(),
            },
            Role {
                name: "head_teacher".to_string(),
                permissions: vec![Permission::new("reports", "read")],
                inherits: vec!["teacher".to_string()],
            },
            Role {
                name: "student".to_string(),
                permissions: vec![
                    Permission::with_conditions(
                        "classroom",
                        "read",
                        vec![Condition::ClassroomMember],
                    ),
                    Permission::with_conditions("grades", "read", vec![Condition::OwnGrades]),
                    Permission::with_conditions("documents", "read", vec![Condition::Owner]),
                    Permission::with_conditions("documents", "write", vec![Condition::Owner]),
                ],
                inherits: Vec::new(),
            },
            Role {
                name: "guardian".to_string(),
                permissions: vec![
                    Permission::with_conditions("grades", "read", vec![Condition::ChildMember]),
                    Permission::with_conditions("classroom", "read", vec![Condition::ChildMember]),
                ],
                inherits: Vec::new(),
            },
        ]
    }
}
