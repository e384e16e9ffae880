//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! API error surface
//!
//! Internal errors from the auth, limiter, and supervisor crates collapse
//! into a small set of client-visible outcomes with stable status and
//! error codes. Authentication failures never reveal which part of the
//! credential or token was wrong.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use gateway_auth::AuthError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway API error
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("IP address is blacklisted")]
    IpBlacklisted,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64, limit: u64 },

    #[error("No worker available")]
    WorkerUnavailable,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::IpBlacklisted => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::WorkerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "AUTH_REQUIRED",
            ApiError::PermissionDenied => "PERMISSION_DENIED",
            ApiError::IpBlacklisted => "IP_BLACKLISTED",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::WorkerUnavailable => "WORKER_UNAVAILABLE",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            // Credential failures are indistinguishable to clients
            AuthError::InvalidCredentials(_)
            | AuthError::AccountInactive(_)
            | AuthError::AccountLocked(_)
            | AuthError::SessionExpired(_)
            | AuthError::SessionNotFound(_)
            | AuthError::TokenValidation(_) => ApiError::Unauthenticated,
            AuthError::PermissionDenied { .. } => ApiError::PermissionDenied,
            AuthError::UserAlreadyExists(username) => {
                ApiError::Conflict(format!("User {} already exists", username))
            }
            AuthError::PasswordRejected(reason) => ApiError::BadRequest(reason),
            AuthError::UserNotFound(_) => ApiError::BadRequest("Unknown user".to_string()),
            AuthError::TokenGeneration(msg)
            | AuthError::Store(msg)
            | AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// JSON body sent with every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Request id when the request-context middleware resolved one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// When the error was produced
    pub timestamp: DateTime<Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = match &self {
            ApiError::RateLimited {
                retry_after_secs,
                limit,
            } => Some(serde_json::json!({
                "retry_after_secs": retry_after_secs,
                "limit": limit,
            })),
            _ => None,
        };

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details,
            request_id: None,
            timestamp: Utc::now(),
        };

        let mut response = (self.status_code(), Json(body)).into_response();
        if let ApiError::RateLimited {
            retry_after_secs, ..
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::PermissionDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::IpBlacklisted.status_code(), StatusCode::FORBIDDEN);
        assert_ne!(
            ApiError::PermissionDenied.error_code(),
            ApiError::IpBlacklisted.error_code()
        );
        assert_eq!(
            ApiError::WorkerUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_credential_failures_collapse() {
        assert!(matches!(
            ApiError::from(AuthError::invalid_credentials("bad password".to_string())),
            ApiError::Unauthenticated
        ));
        assert!(matches!(
            ApiError::from(AuthError::account_locked("too many attempts".to_string())),
            ApiError::Unauthenticated
        ));
        assert!(matches!(
            ApiError::from(AuthError::token_validation("expired".to_string())),
            ApiError::Unauthenticated
        ));
    }

    #[test]
    fn test_rate_limited_response_carries_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 900,
            limit: 5,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "900"
        );
    }
}
