//! Audit logging middleware.
//!
//! Logs every API request with username, method, path, status and
//! latency. Runs innermost (after auth has injected `UserContext`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::UserContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let username = req
        .extensions()
        .get::<UserContext>()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let started = Instant::now();
    let response = next.run(req).await;

    tracing::info!(
        user = %username,
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API access"
    );

    response
}
