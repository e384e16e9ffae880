//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Worker role: the request-serving process
//!
//! A worker binds loopback on the port its supervisor assigned, runs the
//! request pipeline, and serves the auth API plus the permission-guarded
//! application routes. The internal endpoints exist for the supervisor
//! alone: the health probe and the graceful-stop request.

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_auth::{
    AuthManager, Credentials, MemoryMembershipDirectory, MemorySessionStore, MemoryUserStore,
    RedisSessionStore, RequestMeta, SessionStore, TokenClaims, UserStore,
};
use gateway_limiter::{CounterStore, MemoryCounterStore, RateLimiter, RedisCounterStore};
use gateway_supervisor::{WorkerStatus, ENV_WORKER_ID, ENV_WORKER_PORT};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::metrics::WorkerMetrics;
use crate::middleware::{authenticate, authorize, rate_limit, request_context, RouteGuard};
use crate::state::{RequestContext, WorkerState};

/// Run the worker role to completion
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let worker_id = std::env::var(ENV_WORKER_ID).unwrap_or_else(|_| "standalone".to_string());
    let port: u16 = std::env::var(ENV_WORKER_PORT)
        .unwrap_or_else(|_| config.supervisor.base_port.to_string())
        .parse()
        .map_err(|_| ApiError::Internal("Invalid worker port".to_string()))?;

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let state = build_state(config, worker_id.clone(), shutdown_tx).await?;
    bootstrap_admin(&state).await?;

    let sweeper = state.auth.spawn_session_sweeper();
    let app = build_router(state.clone());

    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(worker_id = %worker_id, port = port, "Worker listening");

    let metrics = Arc::clone(&state.metrics);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            _ = shutdown_rx.recv() => info!("Stop requested by supervisor"),
            _ = tokio::signal::ctrl_c() => info!("Ctrl+C received"),
        }
        metrics.set_status(WorkerStatus::Stopping);
    })
    .await?;

    sweeper.abort();
    info!(worker_id = %worker_id, "Worker stopped");
    Ok(())
}

/// Wire the worker's services, choosing memory or Redis stores by config
async fn build_state(
    config: GatewayConfig,
    worker_id: String,
    shutdown: mpsc::Sender<()>,
) -> Result<WorkerState, ApiError> {
    let (session_store, counter_store): (Arc<dyn SessionStore>, Arc<dyn CounterStore>) =
        match &config.redis_url {
            Some(url) => {
                info!("Using Redis-backed session and counter stores");
                let sessions = RedisSessionStore::new(url)
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                let counters = RedisCounterStore::new(url)
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                (Arc::new(sessions), Arc::new(counters))
            }
            None => {
                warn!("No Redis configured, stores are process-local");
                (
                    Arc::new(MemorySessionStore::new()),
                    Arc::new(MemoryCounterStore::new()),
                )
            }
        };

    let user_store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let auth = AuthManager::new(
        config.auth.clone(),
        user_store,
        session_store,
        Arc::new(MemoryMembershipDirectory::new()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let limiter = RateLimiter::new(config.limiter.clone(), counter_store)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(WorkerState {
        config: Arc::new(config),
        auth: Arc::new(auth),
        limiter: Arc::new(limiter),
        metrics: Arc::new(WorkerMetrics::new()),
        shutdown,
        worker_id,
    })
}

/// Create the bootstrap admin account when `PALISADE_ADMIN_PASSWORD` is set
async fn bootstrap_admin(state: &WorkerState) -> Result<(), ApiError> {
    let Ok(password) = std::env::var("PALISADE_ADMIN_PASSWORD") else {
        return Ok(());
    };
    match state
        .auth
        .users()
        .create_user("admin", "admin@localhost", &password, "super_admin")
        .await
    {
        Ok(_) => info!("Bootstrap admin account created"),
        Err(gateway_auth::AuthError::UserAlreadyExists(_)) => {}
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    }
    Ok(())
}

/// Assemble the worker router: internal endpoints bypass the pipeline,
/// everything else runs request-context → rate-limit → authenticate
pub fn build_router(state: WorkerState) -> Router {
    let grades_guard = RouteGuard::new(state.clone(), "grades", "read");
    let documents_guard = RouteGuard::new(state.clone(), "documents", "create");
    let classroom_guard = RouteGuard::new(state.clone(), "classroom", "read");
    let reports_guard = RouteGuard::new(state.clone(), "reports", "read");

    let api = Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/logout-all", post(logout_all))
        .route("/api/v1/auth/sessions", get(list_sessions))
        .route(
            "/api/v1/grades",
            get(list_grades).layer(from_fn_with_state(grades_guard, authorize)),
        )
        .route(
            "/api/v1/documents",
            post(create_document).layer(from_fn_with_state(documents_guard, authorize)),
        )
        .route(
            "/api/v1/classrooms",
            get(list_classrooms).layer(from_fn_with_state(classroom_guard, authorize)),
        )
        .route(
            "/api/v1/reports",
            get(list_reports).layer(from_fn_with_state(reports_guard, authorize)),
        )
        // Innermost layer runs last
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn_with_state(state.clone(), request_context))
        .layer(TraceLayer::new_for_http());

    let internal = Router::new()
        .route("/internal/health", get(internal_health))
        .route("/internal/stats", get(internal_stats))
        .route("/internal/shutdown", post(internal_shutdown));

    api.merge(internal).with_state(state)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct UserSummary {
    id: String,
    username: String,
    role: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    expires_in_secs: u64,
    session_id: String,
    user: UserSummary,
}

async fn login(
    State(state): State<WorkerState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let credentials = Credentials {
        username: body.username,
        password: body.password,
    };
    let meta = RequestMeta {
        ip_address: context.ip_address,
        user_agent: context.user_agent,
        device_info: None,
    };

    let success = state.auth.authenticate(&credentials, &meta).await?;
    Ok(Json(LoginResponse {
        access_token: success.access_token,
        refresh_token: success.refresh_token,
        token_type: "Bearer",
        expires_in_secs: state.config.auth.jwt.access_token_expiration_secs,
        session_id: success.session_id,
        user: UserSummary {
            id: success.user.id,
            username: success.user.username,
            role: success.user.role,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    expires_in_secs: u64,
}

async fn refresh(
    State(state): State<WorkerState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let pair = state
        .auth
        .refresh(&body.refresh_token)
        .await
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer",
        expires_in_secs: state.config.auth.jwt.access_token_expiration_secs,
    }))
}

async fn logout(
    State(state): State<WorkerState>,
    claims: Option<Extension<TokenClaims>>,
) -> Result<impl IntoResponse, ApiError> {
    let Extension(claims) = claims.ok_or(ApiError::Unauthenticated)?;
    let removed = state.auth.logout(claims.session_id()).await?;
    Ok(Json(serde_json::json!({ "logged_out": removed })))
}

async fn logout_all(
    State(state): State<WorkerState>,
    claims: Option<Extension<TokenClaims>>,
) -> Result<impl IntoResponse, ApiError> {
    let Extension(claims) = claims.ok_or(ApiError::Unauthenticated)?;
    let revoked = state.auth.logout_all(claims.user_id()).await?;
    Ok(Json(serde_json::json!({ "sessions_revoked": revoked })))
}

async fn list_sessions(
    State(state): State<WorkerState>,
    claims: Option<Extension<TokenClaims>>,
) -> Result<impl IntoResponse, ApiError> {
    let Extension(claims) = claims.ok_or(ApiError::Unauthenticated)?;
    let sessions = state.auth.active_sessions(claims.user_id()).await?;
    let sessions: Vec<_> = sessions
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "id": s.id,
                "ip_address": s.ip_address,
                "user_agent": s.user_agent,
                "created_at": s.created_at,
                "last_activity": s.last_activity,
                "current": s.id == claims.session_id(),
            })
        })
        .collect();
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

// The guarded routes below are the application surface this deployment
// fronts; the gateway only demonstrates the guard wiring.

async fn list_grades(Extension(claims): Extension<TokenClaims>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": claims.user_id(),
        "grades": [],
    }))
}

async fn create_document(Extension(claims): Extension<TokenClaims>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "owner_id": claims.user_id(),
            "id": uuid::Uuid::new_v4().to_string(),
        })),
    )
}

async fn list_classrooms(Extension(claims): Extension<TokenClaims>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": claims.user_id(),
        "classrooms": [],
    }))
}

async fn list_reports(Extension(claims): Extension<TokenClaims>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": claims.user_id(),
        "reports": [],
    }))
}

/// The supervisor's probe target
async fn internal_health(State(state): State<WorkerState>) -> impl IntoResponse {
    Json(state.metrics.report())
}

/// Operator view of the worker's subsystem statistics
async fn internal_stats(State(state): State<WorkerState>) -> impl IntoResponse {
    let auth = state.auth.get_stats().await;
    let limiter = state.limiter.get_stats().await;
    Json(serde_json::json!({
        "worker_id": state.worker_id,
        "sessions": auth.sessions,
        "users": auth.users,
        "tokens": auth.tokens,
        "evaluations": auth.evaluations,
        "limiter": limiter,
    }))
}

/// Graceful-stop request from the supervisor
async fn internal_shutdown(State(state): State<WorkerState>) -> impl IntoResponse {
    info!(worker_id = %state.worker_id, "Shutdown requested");
    state.metrics.set_status(WorkerStatus::Stopping);
    let _ = state.shutdown.try_send(());
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "stopping": true })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn test_state() -> WorkerState {
        let (shutdown, _rx) = mpsc::channel(1);
        build_state(GatewayConfig::default(), "test-worker".to_string(), shutdown)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_state_with_defaults() {
        let state = test_state().await;
        assert!(state.auth.health_check().await.is_ok());
        assert!(state.limiter.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_router_builds() {
        let state = test_state().await;
        let _router = build_router(state);
    }

    #[tokio::test]
    async fn test_shutdown_signal_reaches_serve_loop() {
        let (shutdown, mut rx) = mpsc::channel(1);
        let state = build_state(GatewayConfig::default(), "w1".to_string(), shutdown)
            .await
            .unwrap();

        internal_shutdown(State(state.clone())).await;

        assert!(rx.try_recv().is_ok());
        assert_eq!(state.metrics.report().status, WorkerStatus::Stopping);
    }

    fn test_peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo("192.0.2.50:40000".parse().unwrap())
    }

    fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("GET")
            .uri(path)
            .extension(test_peer());
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn login_request(username: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .extension(test_peer())
            .body(Body::from(
                serde_json::json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_enforces_auth_permissions_and_limits() {
        let state = test_state().await;
        state
            .auth
            .users()
            .create_user("alice", "alice@example.com", "CorrectHorse1", "student")
            .await
            .unwrap();
        let app = build_router(state);

        // Anonymous request to a guarded route
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/grades", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(login_request("alice", "CorrectHorse1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(crate::middleware::REQUEST_ID_HEADER));
        let body = response_json(response).await;
        let token = body["access_token"].as_str().unwrap().to_string();

        // Students hold grades/read
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/grades", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // But not reports/read
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/reports", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = response_json(response).await;
        assert_eq!(body["code"], "PERMISSION_DENIED");

        // The login rule allows five attempts per window from one address;
        // four wrong-password tries spend the rest of the budget
        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(login_request("alice", "WrongHorse1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .clone()
            .oneshot(login_request("alice", "CorrectHorse1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("900")
        );
        let body = response_json(response).await;
        assert_eq!(body["code"], "RATE_LIMITED");
    }
}
