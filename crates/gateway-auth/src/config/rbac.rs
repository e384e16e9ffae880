//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role-based access control configuration

use serde::{Deserialize, Serialize};

use crate::rbac::Role;

/// Role-based access control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Whether authorization is enforced
    pub enabled: bool,

    /// Role name that bypasses all permission checks
    pub super_admin_role: String,

    /// Role assigned to newly created users
    pub default_role: String,

    /// Evaluation result cache TTL in seconds
    pub cache_ttl_secs: u64,

    /// Static role table, loaded once at startup
    pub roles: Vec<Role>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            super_admin_role: crate::SUPER_ADMIN_ROLE.to_string(),
            default_role: "student".to_string(),
            cache_ttl_secs: crate::DEFAULT_PERMISSION_CACHE_TTL_SECS,
            roles: Role::default_roles(),
        }
    }
}

impl RbacConfig {
    /// Evaluation cache TTL as a chrono duration
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rbac_config_default() {
        let config = RbacConfig::default();
        assert!(config.enabled);
        assert_eq!(config.super_admin_role, "super_admin");
        assert_eq!(config.default_role, "student");
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(config.roles.iter().any(|r| r.name == "teacher"));
    }
}
