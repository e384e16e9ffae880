//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Token issuance and validation
//!
//! Tokens are HS256 JWTs. There is deliberately no token blacklist here:
//! revocation is carried by session removal, which invalidates every token
//! bound to the session on its next verification.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::tokens::claims::{TokenClaims, TokenType};
use crate::tokens::stats::TokenStats;

/// An access/refresh token pair bound to one session
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived access token
    pub access_token: String,

    /// Long-lived refresh token
    pub refresh_token: String,
}

/// Token manager
pub struct TokenManager {
    /// Token configuration
    config: JwtConfig,

    /// Encoding key for signing
    encoding_key: EncodingKey,

    /// Decoding key for validation
    decoding_key: DecodingKey,

    /// Statistics
    stats: Arc<RwLock<TokenStats>>,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
            stats: Arc::new(RwLock::new(TokenStats::new())),
        }
    }

    fn sign(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::token_generation(format!("Failed to sign token: {}", e)))
    }

    /// Issue an access token bound to a session
    pub async fn issue_access(
        &self,
        user_id: &str,
        role: &str,
        session_id: &str,
    ) -> AuthResult<String> {
        let claims = TokenClaims::new_access(user_id, role, session_id, &self.config);
        let token = self.sign(&claims)?;

        let mut stats = self.stats.write().await;
        stats.record_access_issued();
        Ok(token)
    }

    /// Issue a refresh token bound to a session
    pub async fn issue_refresh(
        &self,
        user_id: &str,
        role: &str,
        session_id: &str,
    ) -> AuthResult<String> {
        let claims = TokenClaims::new_refresh(user_id, role, session_id, &self.config);
        let token = self.sign(&claims)?;

        let mut stats = self.stats.write().await;
        stats.record_refresh_issued();
        Ok(token)
    }

    /// Issue both tokens bound to the same session
    pub async fn issue_pair(
        &self,
        user_id: &str,
        role: &str,
        session_id: &str,
    ) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, role, session_id).await?,
            refresh_token: self.issue_refresh(user_id, role, session_id).await?,
        })
    }

    /// Validate a token's signature, expiry, audience, issuer, and type.
    ///
    /// Session binding is the caller's responsibility; this only proves the
    /// token itself is genuine.
    pub async fn validate(&self, token: &str, expected: TokenType) -> AuthResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);

        let outcome = decode::<TokenClaims>(token, &self.decoding_key, &validation);

        let claims = match outcome {
            Ok(data) => data.claims,
            Err(e) => {
                let mut stats = self.stats.write().await;
                stats.record_validation(false);
                return Err(AuthError::token_validation(format!(
                    "Token validation failed: {}",
                    e
                )));
            }
        };

        if claims.typ != expected {
            let mut stats = self.stats.write().await;
            stats.record_validation(false);
            return Err(AuthError::token_validation(
                "Unexpected token type".to_string(),
            ));
        }

        if claims.is_expired() {
            let mut stats = self.stats.write().await;
            stats.record_validation(false);
            return Err(AuthError::token_validation("Token expired".to_string()));
        }

        {
            let mut stats = self.stats.write().await;
            stats.record_validation(true);
        }
        Ok(claims)
    }

    /// Get token statistics
    pub async fn get_stats(&self) -> TokenStats {
        self.stats.read().await.clone()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("encoding_key", &"<sensitive>")
            .field("decoding_key", &"<sensitive>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(JwtConfig::default())
    }

    #[tokio::test]
    async fn test_issue_and_validate_access_token() {
        let manager = manager();
        let token = manager
            .issue_access("u-1", "student", "sess-1")
            .await
            .unwrap();

        let claims = manager.validate(&token, TokenType::Access).await.unwrap();
        assert_eq!(claims.user_id(), "u-1");
        assert_eq!(claims.role, "student");
        assert_eq!(claims.session_id(), "sess-1");
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let manager = manager();
        let refresh = manager
            .issue_refresh("u-1", "student", "sess-1")
            .await
            .unwrap();

        assert!(manager.validate(&refresh, TokenType::Access).await.is_err());
        assert!(manager.validate(&refresh, TokenType::Refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_pair_is_bound_to_one_session() {
        let manager = manager();
        let pair = manager.issue_pair("u-1", "student", "sess-7").await.unwrap();

        let access = manager
            .validate(&pair.access_token, TokenType::Access)
            .await
            .unwrap();
        let refresh = manager
            .validate(&pair.refresh_token, TokenType::Refresh)
            .await
            .unwrap();
        assert_eq!(access.session_id(), "sess-7");
        assert_eq!(refresh.session_id(), "sess-7");
    }

    #[tokio::test]
    async fn test_tampered_token_fails() {
        let manager = manager();
        let token = manager
            .issue_access("u-1", "student", "sess-1")
            .await
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');
        assert!(manager.validate(&tampered, TokenType::Access).await.is_err());

        assert!(manager
            .validate("not-a-token", TokenType::Access)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_foreign_issuer_fails() {
        let manager = manager();

        let mut foreign_config = JwtConfig::default();
        foreign_config.issuer = "someone-else".to_string();
        let foreign = TokenManager::new(foreign_config);

        let token = foreign
            .issue_access("u-1", "student", "sess-1")
            .await
            .unwrap();
        assert!(manager.validate(&token, TokenType::Access).await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_secret_fails() {
        let manager = manager();

        let mut other_config = JwtConfig::default();
        other_config.secret = "a-completely-different-secret".to_string();
        let other = TokenManager::new(other_config);

        let token = other
            .issue_access("u-1", "student", "sess-1")
            .await
            .unwrap();
        assert!(manager.validate(&token, TokenType::Access).await.is_err());

        let stats = manager.get_stats().await;
        assert_eq!(stats.validations_failed, 1);
    }
}
