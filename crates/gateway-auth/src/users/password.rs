//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Password hashing and policy
//!
//! Bcrypt work runs on the blocking thread pool so verification never
//! stalls the event loop handling other requests.

use crate::config::{PasswordComplexity, UserConfig};
use crate::error::{AuthError, AuthResult};

/// Bcrypt cost factor
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password with bcrypt
pub async fn hash(password: &str) -> AuthResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST))
        .await
        .map_err(|e| AuthError::internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AuthError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored bcrypt hash.
///
/// A malformed stored hash verifies as false rather than erroring; the
/// caller sees it as a credential mismatch.
pub async fn verify(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("Verification task failed: {}", e)))?
        .unwrap_or(false);
    Ok(verified)
}

/// Check a candidate password against the configured policy
pub fn validate_policy(password: &str, config: &UserConfig) -> AuthResult<()> {
    if password.len() < config.min_password_length {
        return Err(AuthError::password_rejected(format!(
            "Password must be at least {} characters",
            config.min_password_length
        )));
    }
    validate_complexity(password, &config.password_complexity)
}

fn validate_complexity(password: &str, complexity: &PasswordComplexity) -> AuthResult<()> {
    if complexity.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AuthError::password_rejected(
            "Password must contain an uppercase letter".to_string(),
        ));
    }
    if complexity.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AuthError::password_rejected(
            "Password must contain a lowercase letter".to_string(),
        ));
    }
    if complexity.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::password_rejected(
            "Password must contain a digit".to_string(),
        ));
    }
    if complexity.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(AuthError::password_rejected(
            "Password must contain a special character".to_string(),
        ));
    }
    Ok(())
}
