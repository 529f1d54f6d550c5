//! Diagnosis endpoints: basic (classifier only) and advanced (classifier,
//! references and LLM narrative).

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::DiagnosisRecord;
use crate::pipeline::diagnosis::{validate_patient_form, PatientForm};
use crate::pipeline::prediction::Prediction;

pub const DEFAULT_PROVIDER: &str = "groq";

#[derive(Deserialize)]
pub struct AdvancedRequest {
    #[serde(flatten)]
    pub form: PatientForm,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct BasicResponse {
    /// Human-readable outcome, including the legacy sentinel messages.
    pub diagnosis: String,
    pub prediction: Prediction,
    pub record_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct AdvancedResponse {
    pub diagnosis: String,
    pub record: DiagnosisRecord,
    pub record_id: Option<Uuid>,
}

/// `POST /api/diagnosis`: validate, predict, persist.
pub async fn basic(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(form): Json<PatientForm>,
) -> Result<Json<BasicResponse>, ApiError> {
    let patient = validate_patient_form(&form)?;

    // Model load and the record write are blocking.
    let service = ctx.diagnosis.clone();
    let result =
        tokio::task::spawn_blocking(move || service.diagnose_basic(patient, &user.username))
            .await?;

    Ok(Json(BasicResponse {
        diagnosis: result.prediction.to_string(),
        prediction: result.prediction,
        record_id: result.record_id,
    }))
}

/// `POST /api/diagnosis/advanced`: basic path plus references and an
/// LLM narrative from the requested provider (default groq).
pub async fn advanced(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<AdvancedRequest>,
) -> Result<Json<AdvancedResponse>, ApiError> {
    let patient = validate_patient_form(&req.form)?;
    let provider = req
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROVIDER);

    let result = ctx
        .diagnosis
        .diagnose_advanced(patient, provider, &user.username)
        .await;

    Ok(Json(AdvancedResponse {
        diagnosis: result.record.prediction.to_string(),
        record: result.record,
        record_id: result.record_id,
    }))
}
