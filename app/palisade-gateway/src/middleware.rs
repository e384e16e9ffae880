//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker request pipeline
//!
//! Layered outermost-first: request context, rate limiting, then token
//! authentication. Authentication only attaches an identity; rejection is
//! the per-route authorization guard's job, so public routes stay public.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use gateway_auth::{SecurityContext, TokenClaims, TokenManager, TokenType};
use gateway_limiter::{RateLimitDecision, RequestDescriptor};
use std::net::SocketAddr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{RequestContext, WorkerState};

/// Header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Resolve the client IP: first hop of `x-forwarded-for` when the
/// supervisor proxy set it, the socket peer otherwise
pub fn client_ip(headers: &HeaderMap, peer: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Outermost middleware: attach [`RequestContext`], echo the request id,
/// and feed the worker's traffic counters
pub async fn request_context(
    State(state): State<WorkerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = RequestContext {
        request_id: request_id.clone(),
        ip_address: client_ip(request.headers(), &peer),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
        started_at: Utc::now(),
    };
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    state.metrics.record_request(response.status());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Rate-limit middleware.
///
/// Runs before authentication, so the user key is read off the bearer
/// token directly: signature and expiry only, no session lookup. Bad or
/// absent tokens fall back to the client IP. Allowed responses carry
/// quota headers when a rule matched.
pub async fn rate_limit(
    State(state): State<WorkerState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(context) = request.extensions().get::<RequestContext>().cloned() else {
        return ApiError::Internal("Request context missing".to_string()).into_response();
    };

    let user_id = rate_key_user(state.auth.tokens().as_ref(), request.headers()).await;
    let descriptor = RequestDescriptor {
        method: request.method().as_str().to_string(),
        path: request.uri().path().to_string(),
        ip_address: context.ip_address.clone(),
        user_id,
    };

    match state.limiter.check(&descriptor).await {
        RateLimitDecision::Blacklisted => {
            warn!(
                ip = %context.ip_address,
                request_id = %context.request_id,
                "Request from blacklisted IP rejected"
            );
            ApiError::IpBlacklisted.into_response()
        }
        RateLimitDecision::RateLimited {
            retry_after_secs,
            limit,
        } => {
            warn!(
                ip = %context.ip_address,
                path = %descriptor.path,
                request_id = %context.request_id,
                "Rate limit exceeded"
            );
            ApiError::RateLimited {
                retry_after_secs,
                limit,
            }
            .into_response()
        }
        RateLimitDecision::Allowed(quota) => {
            let mut response = next.run(request).await;
            if let Some(quota) = quota {
                let headers = response.headers_mut();
                if let Ok(value) = HeaderValue::from_str(&quota.limit.to_string()) {
                    headers.insert("x-ratelimit-limit", value);
                }
                if let Ok(value) = HeaderValue::from_str(&quota.remaining.to_string()) {
                    headers.insert("x-ratelimit-remaining", value);
                }
            }
            response
        }
    }
}

/// Token authentication middleware.
///
/// A valid bearer access token attaches [`TokenClaims`] to the request;
/// anything else leaves the request anonymous rather than rejecting it.
pub async fn authenticate(
    State(state): State<WorkerState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.auth.verify(&token).await {
            Some(claims) => {
                request.extensions_mut().insert(claims);
            }
            None => {
                debug!("Bearer token rejected, continuing anonymous");
            }
        }
    }
    next.run(request).await
}

/// User id for rate-limit keying, from the bearer token if one validates.
///
/// Does not consult the session store; full authentication happens in
/// the next layer.
async fn rate_key_user(tokens: &TokenManager, headers: &HeaderMap) -> Option<String> {
    let token = bearer_token(headers)?;
    tokens
        .validate(&token, TokenType::Access)
        .await
        .ok()
        .map(|claims| claims.sub)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Per-route authorization guard: a [`WorkerState`] plus the resource and
/// action the route requires
#[derive(Clone)]
pub struct RouteGuard {
    pub state: WorkerState,
    pub resource: &'static str,
    pub action: &'static str,
}

impl RouteGuard {
    pub fn new(state: WorkerState, resource: &'static str, action: &'static str) -> Self {
        Self {
            state,
            resource,
            action,
        }
    }
}

/// Authorization middleware: 401 without an identity, 403 without the
/// guarded permission
pub async fn authorize(
    State(guard): State<RouteGuard>,
    request: Request,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<TokenClaims>().cloned() else {
        return ApiError::Unauthenticated.into_response();
    };

    let (ip_address, user_agent) = request
        .extensions()
        .get::<RequestContext>()
        .map(|c| (c.ip_address.clone(), c.user_agent.clone()))
        .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));

    let context = SecurityContext::new(claims.user_id(), &claims.role, &ip_address, &user_agent);
    let allowed = guard
        .state
        .auth
        .authorize(&context, guard.resource, guard.action, None)
        .await;

    if !allowed {
        warn!(
            user_id = %claims.user_id(),
            role = %claims.role,
            resource = guard.resource,
            action = guard.action,
            "Permission denied"
        );
        return ApiError::PermissionDenied.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_auth::JwtConfig;

    fn peer() -> SocketAddr {
        "10.0.0.9:55555".parse().unwrap()
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, &peer()), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        assert_eq!(client_ip(&HeaderMap::new(), &peer()), "10.0.0.9");
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(bearer_token(&headers).is_none());
    }

    #[tokio::test]
    async fn test_rate_key_user_reads_bearer_subject() {
        let tokens = TokenManager::new(JwtConfig::default());
        let access = tokens
            .issue_access("user-1", "student", "sess-1")
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", access)).unwrap(),
        );
        assert_eq!(
            rate_key_user(&tokens, &headers).await.as_deref(),
            Some("user-1")
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not.a.token"),
        );
        assert!(rate_key_user(&tokens, &headers).await.is_none());
    }
}
