//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Token claims definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Token type discriminator carried in the claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Signed, self-contained claims for access and refresh tokens.
///
/// Both token kinds are bound to a session through `sid`: a token whose
/// session no longer exists is rejected regardless of its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,

    /// Role the user held when the token was minted
    pub role: String,

    /// Session id the token is bound to
    pub sid: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at
    pub iat: i64,

    /// Expiration time
    pub exp: i64,

    /// Token id
    pub jti: String,

    /// Token type discriminator
    pub typ: TokenType,
}

impl TokenClaims {
    fn new(
        user_id: &str,
        role: &str,
        session_id: &str,
        config: &JwtConfig,
        token_type: TokenType,
    ) -> Self {
        let now = Utc::now();
        let lifetime_secs = match token_type {
            TokenType::Access => config.access_token_expiration_secs,
            TokenType::Refresh => config.refresh_token_expiration_secs,
        };

        Self {
            sub: user_id.to_string(),
            role: role.to_string(),
            sid: session_id.to_string(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + lifetime_secs as i64,
            jti: Uuid::new_v4().to_string(),
            typ: token_type,
        }
    }

    /// Create access token claims
    pub fn new_access(user_id: &str, role: &str, session_id: &str, config: &JwtConfig) -> Self {
        Self::new(user_id, role, session_id, config, TokenType::Access)
    }

    /// Create refresh token claims
    pub fn new_refresh(user_id: &str, role: &str, session_id: &str, config: &JwtConfig) -> Self {
        Self::new(user_id, role, session_id, config, TokenType::Refresh)
    }

    /// Get user id
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Get the bound session id
    pub fn session_id(&self) -> &str {
        &self.sid
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }

    /// Expiration time as a DateTime
    pub fn expiration_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}
