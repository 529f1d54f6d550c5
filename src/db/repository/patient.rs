use uuid::Uuid;

use super::decode_all;
use crate::db::{Collection, DatabaseError, Filter, RecordStore, Sort};
use crate::models::DiagnosisRecord;

pub fn insert_diagnosis_record(
    store: &dyn RecordStore,
    record: &DiagnosisRecord,
) -> Result<Uuid, DatabaseError> {
    let doc = serde_json::to_value(record)?;
    store.insert(Collection::Patients, &doc)
}

/// All diagnosis records, newest first.
pub fn list_diagnosis_records(store: &dyn RecordStore) -> Result<Vec<DiagnosisRecord>, DatabaseError> {
    let docs = store.find(
        Collection::Patients,
        &Filter::all(),
        Some(&Sort::descending("created_at")),
    )?;
    Ok(decode_all(Collection::Patients.as_str(), docs))
}

pub fn find_diagnosis_records_by_name(
    store: &dyn RecordStore,
    name: &str,
) -> Result<Vec<DiagnosisRecord>, DatabaseError> {
    let docs = store.find(
        Collection::Patients,
        &Filter::eq("name", name),
        Some(&Sort::descending("created_at")),
    )?;
    Ok(decode_all(Collection::Patients.as_str(), docs))
}
