use uuid::Uuid;

use super::decode_all;
use crate::db::{Collection, DatabaseError, Filter, RecordStore, Sort};
use crate::models::UploadedReport;

pub fn insert_report(store: &dyn RecordStore, report: &UploadedReport) -> Result<Uuid, DatabaseError> {
    let doc = serde_json::to_value(report)?;
    store.insert(Collection::Reports, &doc)
}

/// All uploaded reports, newest upload first.
pub fn list_reports(store: &dyn RecordStore) -> Result<Vec<UploadedReport>, DatabaseError> {
    let docs = store.find(
        Collection::Reports,
        &Filter::all(),
        Some(&Sort::descending("upload_date")),
    )?;
    Ok(decode_all(Collection::Reports.as_str(), docs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;
    use crate::models::ReportStatus;
    use chrono::{Duration, Utc};

    fn report(name: &str, age: Duration) -> UploadedReport {
        UploadedReport {
            id: Uuid::new_v4(),
            filename: format!("20240101_000000_{name}"),
            original_filename: name.into(),
            filepath: format!("/tmp/{name}"),
            content_type: "application/pdf".into(),
            patient_name: "Unknown".into(),
            report_type: "General".into(),
            notes: String::new(),
            uploaded_by: "admin".into(),
            upload_date: Utc::now() - age,
            file_size: 10,
            status: ReportStatus::Uploaded,
        }
    }

    #[test]
    fn reports_listed_newest_first() {
        let store = MemoryRecordStore::new();
        insert_report(&store, &report("old.pdf", Duration::hours(2))).unwrap();
        insert_report(&store, &report("new.pdf", Duration::zero())).unwrap();
        insert_report(&store, &report("mid.pdf", Duration::hours(1))).unwrap();

        let names: Vec<_> = list_reports(&store)
            .unwrap()
            .into_iter()
            .map(|r| r.original_filename)
            .collect();
        assert_eq!(names, vec!["new.pdf", "mid.pdf", "old.pdf"]);
    }
}
