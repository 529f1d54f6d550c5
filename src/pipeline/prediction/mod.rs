//! Classifier side of the pipeline: feature encoding, the tree-ensemble
//! artifact, its trainer and the cached wrapper that turns failures into
//! `Prediction`s.

pub mod classifier;
pub mod features;
pub mod forest;
pub mod training;

pub use classifier::*;
pub use features::*;
pub use forest::*;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Legacy display text for a missing model artifact.
pub const MODEL_NOT_FOUND_MESSAGE: &str = "Model not found. Please train the model first.";

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model artifact not found at {0}")]
    ArtifactMissing(PathBuf),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("{0}")]
    Internal(String),
}

/// Class label taken verbatim from the artifact's class list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosisLabel(String);

impl DiagnosisLabel {
    pub fn new(label: &str) -> Self {
        Self(label.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DiagnosisLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one classifier call as recorded and returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Prediction {
    Label { label: DiagnosisLabel },
    ModelUnavailable,
    Error { detail: String },
}

impl Prediction {
    pub fn label(&self) -> Option<&str> {
        match self {
            Prediction::Label { label } => Some(label.as_str()),
            _ => None,
        }
    }
}

impl From<Result<DiagnosisLabel, ClassifierError>> for Prediction {
    fn from(result: Result<DiagnosisLabel, ClassifierError>) -> Self {
        match result {
            Ok(label) => Prediction::Label { label },
            Err(ClassifierError::ArtifactMissing(_)) => Prediction::ModelUnavailable,
            Err(e) => Prediction::Error {
                detail: e.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prediction::Label { label } => write!(f, "{label}"),
            Prediction::ModelUnavailable => f.write_str(MODEL_NOT_FOUND_MESSAGE),
            Prediction::Error { detail } => write!(f, "Error during prediction: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_becomes_model_unavailable() {
        let p: Prediction = Err(ClassifierError::ArtifactMissing("/nope".into())).into();
        assert_eq!(p, Prediction::ModelUnavailable);
        assert_eq!(p.to_string(), MODEL_NOT_FOUND_MESSAGE);
        assert!(p.label().is_none());
    }

    #[test]
    fn other_failures_keep_detail() {
        let p: Prediction = Err(ClassifierError::Internal("bad tree".into())).into();
        assert_eq!(p.to_string(), "Error during prediction: bad tree");
    }

    #[test]
    fn label_displays_verbatim() {
        let p: Prediction = Ok(DiagnosisLabel::new("Hypertension")).into();
        assert_eq!(p.label(), Some("Hypertension"));
        assert_eq!(p.to_string(), "Hypertension");
    }

    #[test]
    fn serialized_with_status_tag() {
        let json = serde_json::to_value(Prediction::Label {
            label: DiagnosisLabel::new("Flu"),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "label", "label": "Flu"}));
        let json = serde_json::to_value(Prediction::ModelUnavailable).unwrap();
        assert_eq!(json, serde_json::json!({"status": "model_unavailable"}));
    }
}
