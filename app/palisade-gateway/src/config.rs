//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Gateway configuration
//!
//! Loaded from a TOML file when `PALISADE_CONFIG` (or `config/gateway.toml`)
//! is present, then overridden by environment variables, falling back to
//! defaults otherwise.

use gateway_auth::AuthConfig;
use gateway_limiter::{KeyStrategy, LimiterConfig, RateLimitRule};
use gateway_supervisor::SupervisorConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Supervisor listen address for external traffic
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Redis URL; when set, sessions and rate counters use the shared
    /// store so the whole worker pool agrees on both
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Authentication, sessions, tokens, and RBAC
    #[serde(default)]
    pub auth: AuthConfig,

    /// Rate limiting
    #[serde(default = "default_limiter")]
    pub limiter: LimiterConfig,

    /// Worker pool supervision
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

fn default_listen_addr() -> String {
    crate::DEFAULT_LISTEN_ADDR.to_string()
}

/// The stock rule table: a tight credential-guessing limit on login and
/// a broad per-client budget across the API
fn default_limiter() -> LimiterConfig {
    LimiterConfig {
        rules: vec![
            RateLimitRule {
                name: "login".to_string(),
                path: "/api/v1/auth/login".to_string(),
                method: Some("POST".to_string()),
                window_secs: 15 * 60,
                max_requests: 5,
                key_strategy: KeyStrategy::Ip,
            },
            RateLimitRule {
                name: "api".to_string(),
                path: "/api/".to_string(),
                method: None,
                window_secs: 60,
                max_requests: 100,
                key_strategy: KeyStrategy::UserOrIp,
            },
        ],
        ..LimiterConfig::default()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            redis_url: None,
            auth: AuthConfig::default(),
            limiter: default_limiter(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration: TOML file if one is found, then environment
    /// overrides, then defaults
    pub async fn load() -> Result<Self, ApiError> {
        let path = std::env::var("PALISADE_CONFIG")
            .unwrap_or_else(|_| "config/gateway.toml".to_string());

        let mut config = match tokio::fs::read_to_string(&path).await {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ApiError::Internal(format!("Failed to parse config file {}: {}", path, e))
            })?,
            Err(_) => {
                warn!(path = %path, "No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("PALISADE_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Ok(url) = std::env::var("PALISADE_REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Ok(secret) = std::env::var("PALISADE_JWT_SECRET") {
            self.auth.jwt.secret = secret;
        }
        if let Ok(count) = std::env::var("PALISADE_WORKER_COUNT") {
            match count.parse() {
                Ok(count) => self.supervisor.worker_count = count,
                Err(_) => warn!(value = %count, "Ignoring invalid PALISADE_WORKER_COUNT"),
            }
        }
    }

    /// Validate every subsystem's configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        self.auth
            .validate()
            .map_err(|e| ApiError::Internal(format!("Invalid auth configuration: {}", e)))?;
        self.limiter
            .validate()
            .map_err(|e| ApiError::Internal(format!("Invalid limiter configuration: {}", e)))?;
        self.supervisor
            .validate()
            .map_err(|e| ApiError::Internal(format!("Invalid supervisor configuration: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_default_rules_guard_login() {
        let config = GatewayConfig::default();
        let login = config
            .limiter
            .rules
            .iter()
            .find(|r| r.name == "login")
            .unwrap();
        assert_eq!(login.method.as_deref(), Some("POST"));
        assert_eq!(login.max_requests, 5);
        assert_eq!(login.window_secs, 900);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            listen_addr = "127.0.0.1:9000"
            redis_url = "redis://127.0.0.1:6379"

            [supervisor]
            worker_count = 2
            base_port = 9101
            health_check_interval_secs = 10
            startup_grace_secs = 5
            memory_ceiling_bytes = 268435456
            error_rate_threshold = 0.25
            restart_delay_ms = 500
            probe_timeout_secs = 2
            shutdown_grace_secs = 5
        "#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.supervisor.worker_count, 2);
        assert_eq!(config.supervisor.base_port, 9101);
        // Sections that were omitted fall back to defaults
        assert!(config.auth.rbac.enabled);
        assert!(config.validate().is_ok());
    }
}
