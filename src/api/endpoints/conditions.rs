//! Standalone medical reference lookup for a condition name.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::evidence::ConditionSearch;

#[derive(Deserialize)]
pub struct ConditionRequest {
    #[serde(default)]
    pub condition: String,
}

/// `POST /api/conditions/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    Json(req): Json<ConditionRequest>,
) -> Result<Json<ConditionSearch>, ApiError> {
    let condition = req.condition.trim();
    if condition.is_empty() {
        return Err(ApiError::BadRequest("No condition specified".into()));
    }
    Ok(Json(ctx.diagnosis.evidence().search_condition(condition).await))
}
