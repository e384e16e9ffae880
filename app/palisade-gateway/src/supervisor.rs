//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Supervisor role: the externally-facing process
//!
//! The supervisor owns the public listener. It spawns the worker pool
//! (re-executing this same binary in the worker role), keeps the health
//! loop running, proxies application traffic round-robin, and serves the
//! operator surface: health probes, worker listing, and statistics.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gateway_supervisor::{HttpLivenessProbe, ProcessLauncher, Supervisor};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::middleware::client_ip;
use crate::proxy::ProxyClient;

/// Shared state for the supervisor's HTTP surface
#[derive(Clone)]
pub struct SupervisorState {
    supervisor: Arc<Supervisor>,
    proxy: Arc<ProxyClient>,
}

/// Run the supervisor role to completion
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let program = match &config.supervisor.worker_program {
        Some(program) => program.clone(),
        None => std::env::current_exe()?.display().to_string(),
    };
    info!(program = %program, "Workers will run this program");

    let launcher = Arc::new(ProcessLauncher::new(program));
    let probe = Arc::new(HttpLivenessProbe::new(config.supervisor.probe_timeout_secs));
    let supervisor = Arc::new(Supervisor::new(
        config.supervisor.clone(),
        launcher,
        probe,
    )?);

    supervisor.start().await?;
    let health_loop = supervisor.spawn_health_loop();

    let state = SupervisorState {
        supervisor: Arc::clone(&supervisor),
        proxy: Arc::new(ProxyClient::new(crate::DEFAULT_PROXY_TIMEOUT_SECS)),
    };
    let app = build_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Gateway listening");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        error!("HTTP server error: {}", e);
    }

    health_loop.abort();
    supervisor.shutdown().await;
    info!("Gateway shutdown completed");
    Ok(())
}

/// Assemble the supervisor router; everything unmatched is proxied
pub fn build_router(state: SupervisorState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .route("/supervisor/workers", get(list_workers))
        .route("/supervisor/stats", get(stats))
        .fallback(proxy_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<SupervisorState>) -> impl IntoResponse {
    let workers = state.supervisor.workers().await;
    let running = workers
        .iter()
        .filter(|w| w.status == gateway_supervisor::WorkerStatus::Running)
        .count();
    Json(serde_json::json!({
        "status": if running > 0 { "healthy" } else { "degraded" },
        "workers_total": workers.len(),
        "workers_running": running,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_live() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "alive",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_ready(State(state): State<SupervisorState>) -> impl IntoResponse {
    let ready = state.supervisor.health_check().await;
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

async fn list_workers(State(state): State<SupervisorState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "workers": state.supervisor.workers().await,
    }))
}

async fn stats(State(state): State<SupervisorState>) -> impl IntoResponse {
    Json(state.supervisor.get_stats().await)
}

/// Dispatch a request to the next running worker
async fn proxy_request(
    State(state): State<SupervisorState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let Some(worker) = state.supervisor.next_worker().await else {
        return ApiError::WorkerUnavailable.into_response();
    };

    let ip = client_ip(request.headers(), &peer);
    match state.proxy.forward(worker.port, request, &ip).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, shutting down");
        }
        _ = terminate => {
            info!("SIGTERM received, shutting down");
        }
    }
}
