//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Token configuration

use serde::{Deserialize, Serialize};

/// Token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signing secret
    pub secret: String,

    /// Access token lifetime in seconds
    pub access_token_expiration_secs: u64,

    /// Refresh token lifetime in seconds
    pub refresh_token_expiration_secs: u64,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-this-secret-in-production".to_string(),
            access_token_expiration_secs: crate::DEFAULT_ACCESS_TOKEN_EXPIRATION_SECS,
            refresh_token_expiration_secs: crate::DEFAULT_REFRESH_TOKEN_EXPIRATION_SECS,
            issuer: "palisade-gateway".to_string(),
            audience: "palisade-clients".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_config_default() {
        let config = JwtConfig::default();
        assert!(!config.secret.is_empty());
        assert_eq!(config.access_token_expiration_secs, 24 * 60 * 60);
        assert_eq!(config.refresh_token_expiration_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.issuer, "palisade-gateway");
        assert_eq!(config.audience, "palisade-clients");
    }
}
