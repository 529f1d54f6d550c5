use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DiagnosisType;
use super::patient::PatientInput;
use super::timestamp;
use crate::pipeline::evidence::EvidenceBundle;
use crate::pipeline::narrative::NarrativeResult;
use crate::pipeline::prediction::Prediction;

pub const ADVANCED_DISCLAIMER: &str = "This is an AI-assisted analysis for educational purposes only. \
Always consult qualified healthcare professionals for medical advice and treatment.";

/// One diagnosis as persisted in the `patients` collection.
///
/// Created once by the orchestrator and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub patient: PatientInput,
    pub symptom_list: Vec<String>,
    pub prediction: Prediction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<NarrativeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceBundle>,
    pub diagnosis_type: DiagnosisType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    pub issued_by: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl DiagnosisRecord {
    pub fn basic(patient: PatientInput, prediction: Prediction, issued_by: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            symptom_list: patient.symptom_list(),
            patient,
            prediction,
            narrative: None,
            evidence: None,
            diagnosis_type: DiagnosisType::Basic,
            disclaimer: None,
            issued_by: issued_by.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn advanced(
        patient: PatientInput,
        prediction: Prediction,
        narrative: NarrativeResult,
        evidence: EvidenceBundle,
        issued_by: &str,
    ) -> Self {
        Self {
            narrative: Some(narrative),
            evidence: Some(evidence),
            diagnosis_type: DiagnosisType::Advanced,
            disclaimer: Some(ADVANCED_DISCLAIMER.to_string()),
            ..Self::basic(patient, prediction, issued_by)
        }
    }
}
