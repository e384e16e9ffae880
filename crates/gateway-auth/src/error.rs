//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Authentication and authorization error types

use thiserror::Error;

/// Authentication result type
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization error
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Account inactive: {0}")]
    AccountInactive(String),

    #[error("Account locked: {0}")]
    AccountLocked(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Password rejected: {0}")]
    PasswordRejected(String),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Token validation failed: {0}")]
    TokenValidation(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Permission denied for role {role} on {resource}:{action}")]
    PermissionDenied {
        role: String,
        resource: String,
        action: String,
    },

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_credentials(msg: String) -> Self {
        Self::InvalidCredentials(msg)
    }

    pub fn account_inactive(msg: String) -> Self {
        Self::AccountInactive(msg)
    }

    pub fn account_locked(msg: String) -> Self {
        Self::AccountLocked(msg)
    }

    pub fn user_not_found(msg: String) -> Self {
        Self::UserNotFound(msg)
    }

    pub fn user_already_exists(msg: String) -> Self {
        Self::UserAlreadyExists(msg)
    }

    pub fn password_rejected(msg: String) -> Self {
        Self::PasswordRejected(msg)
    }

    pub fn token_generation(msg: String) -> Self {
        Self::TokenGeneration(msg)
    }

    pub fn token_validation(msg: String) -> Self {
        Self::TokenValidation(msg)
    }

    pub fn session_expired(msg: String) -> Self {
        Self::SessionExpired(msg)
    }

    pub fn session_not_found(msg: String) -> Self {
        Self::SessionNotFound(msg)
    }

    pub fn permission_denied(role: String, resource: String, action: String) -> Self {
        Self::PermissionDenied {
            role,
            resource,
            action,
        }
    }

    pub fn store(msg: String) -> Self {
        Self::Store(msg)
    }

    pub fn internal(msg: String) -> Self {
        Self::Internal(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_credentials("unknown user".to_string());
        assert_eq!(err.to_string(), "Invalid credentials: unknown user");

        let err = AuthError::permission_denied(
            "student".to_string(),
            "grades".to_string(),
            "write".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "Permission denied for role student on grades:write"
        );
    }
}
