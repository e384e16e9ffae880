//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Aggregate authentication configuration

use serde::{Deserialize, Serialize};

use super::jwt::JwtConfig;
use super::rbac::RbacConfig;
use super::session::SessionConfig;
use super::users::UserConfig;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Token configuration
    pub jwt: JwtConfig,

    /// Session configuration
    pub session: SessionConfig,

    /// User management configuration
    pub users: UserConfig,

    /// Role-based access control configuration
    pub rbac: RbacConfig,
}

impl AuthConfig {
    /// Validate the authentication configuration
    pub fn validate(&self) -> crate::AuthResult<()> {
        if self.jwt.secret.is_empty() {
            return Err(crate::AuthError::internal(
                "JWT secret cannot be empty".to_string(),
            ));
        }

        if self.session.max_sessions_per_user == 0 {
            return Err(crate::AuthError::internal(
                "max_sessions_per_user must be at least 1".to_string(),
            ));
        }

        if self.rbac.enabled {
            let known = |name: &str| self.rbac.roles.iter().any(|r| r.name == name);
            if !known(&self.rbac.default_role) {
                return Err(crate::AuthError::internal(format!(
                    "default role {} is not in the role table",
                    self.rbac.default_role
                )));
            }
            for role in &self.rbac.roles {
                for parent in &role.inherits {
                    if !known(parent) {
                        return Err(crate::AuthError::internal(format!(
                            "role {} inherits unknown role {}",
                            role.name, parent
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
