//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Request forwarding to worker processes
//!
//! The supervisor terminates the external connection and replays the
//! request against a worker on loopback. Hop-by-hop headers stay on
//! their own hop; the client address travels in `x-forwarded-for`.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Largest request body the proxy will buffer
pub const MAX_PROXY_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Whether a header must not be forwarded across the proxy hop
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

/// Forwards requests to workers over loopback
pub struct ProxyClient {
    client: reqwest::Client,
}

impl ProxyClient {
    /// Create a proxy client with the given per-request timeout
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Replay a request against the worker on `port` and translate the
    /// worker's response back
    pub async fn forward(
        &self,
        port: u16,
        request: Request,
        client_ip: &str,
    ) -> Result<Response<Body>, ApiError> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("http://127.0.0.1:{}{}", port, path_and_query);

        let body = axum::body::to_bytes(body, MAX_PROXY_BODY_BYTES)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Unreadable request body: {}", e)))?;

        let mut builder = self.client.request(parts.method.clone(), &url);
        for (name, value) in parts.headers.iter() {
            if !is_hop_by_hop(name.as_str()) && name.as_str() != "x-forwarded-for" {
                builder = builder.header(name, value);
            }
        }
        let forwarded = match parts.headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, client_ip),
            None => client_ip.to_string(),
        };
        builder = builder.header("x-forwarded-for", forwarded);

        debug!(method = %parts.method, url = %url, "Forwarding request");
        let upstream = builder.body(body).send().await.map_err(|e| {
            warn!(port = port, error = %e, "Worker request failed");
            ApiError::WorkerUnavailable
        })?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|_| ApiError::WorkerUnavailable)?;

        let mut response = Response::builder().status(status);
        for (name, value) in headers.iter() {
            if !is_hop_by_hop(name.as_str()) {
                response = response.header(name, value);
            }
        }
        response
            .body(Body::from(bytes))
            .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
    }
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_headers_filtered() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(is_hop_by_hop("HOST"));
        assert!(!is_hop_by_hop("authorization"));
        assert!(!is_hop_by_hop("content-type"));
        assert!(!is_hop_by_hop("x-request-id"));
    }

    #[tokio::test]
    async fn test_forward_to_closed_port_is_unavailable() {
        let proxy = ProxyClient::new(1);
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/grades")
            .body(Body::empty())
            .unwrap();

        // Port 9 (discard) is not listening on loopback
        let result = proxy.forward(9, request, "203.0.113.7").await;
        assert!(matches!(result, Err(ApiError::WorkerUnavailable)));
    }
}
