//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::Collection;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus a record store probe.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let database = match ctx.store.count(Collection::Users) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: record store unavailable");
            false
        }
    };

    Ok(Json(HealthResponse {
        status: "ok",
        database,
        version: crate::config::APP_VERSION,
    }))
}
