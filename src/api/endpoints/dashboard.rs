//! Dashboard: stored diagnoses, newest first, optionally for one patient.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{find_diagnosis_records_by_name, list_diagnosis_records};
use crate::models::DiagnosisRecord;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Exact patient name; blank means all records.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub total: usize,
    pub records: Vec<DiagnosisRecord>,
}

/// `GET /api/dashboard[?name=<patient>]`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let records = match name {
        Some(name) => find_diagnosis_records_by_name(ctx.store.as_ref(), name)?,
        None => list_diagnosis_records(ctx.store.as_ref())?,
    };
    Ok(Json(DashboardResponse {
        total: records.len(),
        records,
    }))
}
