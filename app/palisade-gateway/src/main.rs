//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Main binary for the Palisade gateway

use gateway_supervisor::ENV_ROLE;
use palisade_gateway::{config::GatewayConfig, GATEWAY_NAME, GATEWAY_VERSION};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let role = std::env::var(ENV_ROLE).unwrap_or_else(|_| "supervisor".to_string());
    info!("Starting {} v{} as {}", GATEWAY_NAME, GATEWAY_VERSION, role);

    let config = GatewayConfig::load().await?;

    match role.as_str() {
        "worker" => palisade_gateway::worker::run(config).await,
        "supervisor" => palisade_gateway::supervisor::run(config).await,
        other => Err(format!("Unknown role: {}", other).into()),
    }
}
