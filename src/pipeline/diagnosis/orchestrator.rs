use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::db::{insert_diagnosis_record, RecordStore};
use crate::models::{DiagnosisRecord, PatientInput};
use crate::pipeline::evidence::EvidenceAggregator;
use crate::pipeline::narrative::NarrativeGenerator;
use crate::pipeline::prediction::{encode, Classifier, FeatureVector, Prediction};

#[derive(Debug, Clone, Serialize)]
pub struct BasicDiagnosis {
    pub prediction: Prediction,
    pub record_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvancedDiagnosis {
    pub record: DiagnosisRecord,
    pub record_id: Option<Uuid>,
}

fn classify(classifier: &dyn Classifier, features: &FeatureVector) -> Prediction {
    let prediction: Prediction = classifier.predict(features).into();
    if let Prediction::Error { detail } = &prediction {
        tracing::error!(error = %detail, "Classifier failed");
    }
    prediction
}

/// Record persistence failures are logged and reported as `None`.
fn store_record(store: &dyn RecordStore, record: &DiagnosisRecord) -> Option<Uuid> {
    match insert_diagnosis_record(store, record) {
        Ok(id) => {
            tracing::info!(
                record_id = %id,
                diagnosis_type = %record.diagnosis_type,
                "Diagnosis record stored"
            );
            Some(id)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to store diagnosis record");
            None
        }
    }
}

/// Composes encoder, classifier, evidence and narrative into one
/// persisted diagnosis record per request.
pub struct DiagnosisService {
    store: Arc<dyn RecordStore>,
    classifier: Arc<dyn Classifier>,
    evidence: Arc<EvidenceAggregator>,
    narrative: Arc<NarrativeGenerator>,
}

impl DiagnosisService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        classifier: Arc<dyn Classifier>,
        evidence: Arc<EvidenceAggregator>,
        narrative: Arc<NarrativeGenerator>,
    ) -> Self {
        Self {
            store,
            classifier,
            evidence,
            narrative,
        }
    }

    pub fn evidence(&self) -> &EvidenceAggregator {
        &self.evidence
    }

    /// Blocking: may load the artifact and takes the store lock.
    pub fn diagnose_basic(&self, patient: PatientInput, issued_by: &str) -> BasicDiagnosis {
        let prediction = classify(self.classifier.as_ref(), &encode(&patient));
        let record = DiagnosisRecord::basic(patient, prediction.clone(), issued_by);
        let record_id = store_record(self.store.as_ref(), &record);
        BasicDiagnosis {
            prediction,
            record_id,
        }
    }

    /// Evidence is gathered for the predicted label, or for the symptom
    /// text when no label is available.
    pub async fn diagnose_advanced(
        &self,
        patient: PatientInput,
        provider: &str,
        issued_by: &str,
    ) -> AdvancedDiagnosis {
        let prediction = self.predict_off_thread(encode(&patient)).await;
        let symptoms = patient.symptom_list();
        let label = prediction.label();
        let query = label.unwrap_or(patient.symptoms.as_str());

        let (evidence, narrative) = tokio::join!(
            self.evidence.gather(query),
            self.narrative.generate(&symptoms, &patient, provider, label),
        );

        let record =
            DiagnosisRecord::advanced(patient, prediction, narrative, evidence, issued_by);
        let record_id = self.persist_off_thread(record.clone()).await;
        AdvancedDiagnosis { record, record_id }
    }

    async fn predict_off_thread(&self, features: FeatureVector) -> Prediction {
        let classifier = self.classifier.clone();
        tokio::task::spawn_blocking(move || classify(classifier.as_ref(), &features))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Classifier task failed");
                Prediction::Error {
                    detail: format!("classifier task failed: {e}"),
                }
            })
    }

    async fn persist_off_thread(&self, record: DiagnosisRecord) -> Option<Uuid> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store_record(store.as_ref(), &record))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Record store task failed");
                None
            })
    }
}
