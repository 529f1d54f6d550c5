//! Report upload (multipart) and listing.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::list_reports;
use crate::models::UploadedReport;
use crate::uploads::{save_report, ReportUpload};

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub report: UploadedReport,
}

#[derive(Serialize)]
pub struct ReportListResponse {
    pub total: usize,
    pub reports: Vec<UploadedReport>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Malformed upload: {}", err.body_text()))
    }
}

/// `POST /api/reports`: fields `report_file`, `patient_name`,
/// `report_type`, `notes`.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload = ReportUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "report_file" => {
                upload.original_filename = field.file_name().unwrap_or_default().to_string();
                upload.data = field.bytes().await.map_err(multipart_error)?.to_vec();
            }
            "patient_name" => upload.patient_name = Some(field.text().await.map_err(multipart_error)?),
            "report_type" => upload.report_type = Some(field.text().await.map_err(multipart_error)?),
            "notes" => upload.notes = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let report = save_report(ctx.store.as_ref(), &ctx.upload_dir, upload, &user.username).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: format!("Report uploaded successfully: {}", report.original_filename),
            report,
        }),
    ))
}

/// `GET /api/reports`: newest upload first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ReportListResponse>, ApiError> {
    let reports = list_reports(ctx.store.as_ref())?;
    Ok(Json(ReportListResponse {
        total: reports.len(),
        reports,
    }))
}
