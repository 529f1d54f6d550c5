use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReportStatus;
use super::timestamp;

/// Metadata for an uploaded medical report file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedReport {
    pub id: Uuid,
    /// Stored name: `YYYYMMDD_HHMMSS_<sanitized original>`.
    pub filename: String,
    pub original_filename: String,
    pub filepath: String,
    pub content_type: String,
    pub patient_name: String,
    pub report_type: String,
    pub notes: String,
    pub uploaded_by: String,
    #[serde(with = "timestamp")]
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    pub status: ReportStatus,
}
