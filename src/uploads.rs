//! Medical report uploads: filename policy and on-disk storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::db::{insert_report, DatabaseError, RecordStore};
use crate::models::{ReportStatus, UploadedReport};

pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "png", "jpg", "jpeg", "txt", "doc", "docx"];
pub const DEFAULT_PATIENT_NAME: &str = "Unknown";
pub const DEFAULT_REPORT_TYPE: &str = "General";

/// `_1`, `_2`, ... suffixes tried before an upload name counts as exhausted.
const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file selected")]
    NoFile,

    #[error("Invalid file type. Allowed types: PDF, PNG, JPG, JPEG, TXT, DOC, DOCX")]
    InvalidFileType,

    #[error("File write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Lowercased extension when it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Strip directories, replace characters outside `[A-Za-z0-9._-]` with `_`
/// and drop leading dots.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let replaced: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    replaced.trim_start_matches('.').to_string()
}

/// `YYYYMMDD_HHMMSS_<sanitized>`
pub fn stored_filename(now: DateTime<Utc>, original: &str) -> String {
    format!("{}_{}", now.format("%Y%m%d_%H%M%S"), sanitize_filename(original))
}

/// `name.ext` → `name_<n>.ext`; `n == 0` keeps the name.
fn numbered_filename(filename: &str, n: usize) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{n}.{ext}"),
        None => format!("{filename}_{n}"),
    }
}

/// Write `data` to a file under `dir` that did not exist before, adding a
/// numeric suffix when `filename` is taken. Returns the name used.
async fn write_new_file(
    dir: &Path,
    filename: &str,
    data: &[u8],
) -> std::io::Result<(String, PathBuf)> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let candidate = numbered_filename(filename, n);
        let path = dir.join(&candidate);
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };
        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        return Ok((candidate, path));
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {filename}"),
    ))
}

/// Upload as received from the client.
#[derive(Debug, Default)]
pub struct ReportUpload {
    pub original_filename: String,
    pub data: Vec<u8>,
    pub patient_name: Option<String>,
    pub report_type: Option<String>,
    pub notes: Option<String>,
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Write the file under `upload_dir` and record its metadata.
pub async fn save_report(
    store: &dyn RecordStore,
    upload_dir: &Path,
    upload: ReportUpload,
    uploaded_by: &str,
) -> Result<UploadedReport, UploadError> {
    if upload.original_filename.trim().is_empty() {
        return Err(UploadError::NoFile);
    }
    if allowed_extension(&upload.original_filename).is_none() {
        return Err(UploadError::InvalidFileType);
    }

    let now = Utc::now();
    tokio::fs::create_dir_all(upload_dir).await?;
    let (filename, filepath) = write_new_file(
        upload_dir,
        &stored_filename(now, &upload.original_filename),
        &upload.data,
    )
    .await?;

    let report = UploadedReport {
        id: Uuid::new_v4(),
        content_type: mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        filename,
        original_filename: upload.original_filename,
        filepath: filepath.to_string_lossy().into_owned(),
        patient_name: non_blank(upload.patient_name, DEFAULT_PATIENT_NAME),
        report_type: non_blank(upload.report_type, DEFAULT_REPORT_TYPE),
        notes: upload.notes.unwrap_or_default(),
        uploaded_by: uploaded_by.to_string(),
        upload_date: now,
        file_size: upload.data.len() as u64,
        status: ReportStatus::Uploaded,
    };

    if let Err(e) = insert_report(store, &report) {
        // Metadata is the source of truth; drop the orphaned file.
        let _ = tokio::fs::remove_file(&filepath).await;
        return Err(e.into());
    }

    tracing::info!(
        filename = %report.filename,
        size = report.file_size,
        uploaded_by,
        "Report uploaded"
    );
    Ok(report)
}
