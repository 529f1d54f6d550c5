use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::features::FeatureVector;
use super::forest::ForestArtifact;
use super::{ClassifierError, DiagnosisLabel};

/// Classifier abstraction (allows mocking)
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<DiagnosisLabel, ClassifierError>;
}

/// Classifier backed by a forest artifact on disk.
///
/// The artifact is loaded on first use and cached once a load succeeds.
/// Failed loads are not cached, so a model written after start-up is
/// picked up by the next prediction.
pub struct ArtifactClassifier {
    path: PathBuf,
    cache: RwLock<Option<Arc<ForestArtifact>>>,
}

impl ArtifactClassifier {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to load the artifact now and log the outcome. Start-up only.
    pub fn probe(&self) -> bool {
        match self.artifact() {
            Ok(artifact) => {
                tracing::info!(
                    model = %self.path.display(),
                    classes = artifact.classes.len(),
                    trees = artifact.trees.len(),
                    "Diagnostic model loaded"
                );
                true
            }
            Err(ClassifierError::ArtifactMissing(_)) => {
                tracing::warn!(
                    model = %self.path.display(),
                    "Diagnostic model not found; predictions unavailable until it is trained"
                );
                false
            }
            Err(e) => {
                tracing::error!(model = %self.path.display(), error = %e, "Diagnostic model unusable");
                false
            }
        }
    }

    fn artifact(&self) -> Result<Arc<ForestArtifact>, ClassifierError> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| ClassifierError::Internal("model cache lock poisoned".into()))?;
            if let Some(artifact) = cache.as_ref() {
                return Ok(Arc::clone(artifact));
            }
        }

        let loaded = Arc::new(ForestArtifact::load(&self.path)?);
        let mut cache = self
            .cache
            .write()
            .map_err(|_| ClassifierError::Internal("model cache lock poisoned".into()))?;
        // Another request may have loaded it meanwhile; keep the first.
        let artifact = cache.get_or_insert_with(|| Arc::clone(&loaded));
        Ok(Arc::clone(artifact))
    }
}

impl Classifier for ArtifactClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<DiagnosisLabel, ClassifierError> {
        let artifact = self.artifact()?;
        let label = artifact.predict(&features.as_array())?;
        tracing::debug!(label, "Classifier prediction");
        Ok(DiagnosisLabel::new(label))
    }
}

/// Mock classifier for testing: always returns the configured outcome.
pub struct MockClassifier {
    label: Option<String>,
}

impl MockClassifier {
    pub fn returning(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
        }
    }

    /// Behaves like a classifier whose artifact has not been trained yet.
    pub fn missing() -> Self {
        Self { label: None }
    }
}

impl Classifier for MockClassifier {
    fn predict(&self, _features: &FeatureVector) -> Result<DiagnosisLabel, ClassifierError> {
        match &self.label {
            Some(label) => Ok(DiagnosisLabel::new(label)),
            None => Err(ClassifierError::ArtifactMissing(PathBuf::from("mock"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::prediction::forest::tests::SAMPLE_FOREST;
    use crate::pipeline::prediction::Prediction;

    fn features() -> FeatureVector {
        FeatureVector {
            age: 45.0,
            gender_numeric: 0,
            bp: 140.0,
            glucose: 110.0,
            heart_rate: 85.0,
        }
    }

    #[test]
    fn missing_artifact_yields_model_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let classifier = ArtifactClassifier::new(tmp.path().join("model.json"));
        let prediction: Prediction = classifier.predict(&features()).into();
        assert_eq!(prediction, Prediction::ModelUnavailable);
        assert!(!classifier.probe());
    }

    #[test]
    fn artifact_written_later_is_picked_up() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model.json");
        let classifier = ArtifactClassifier::new(path.clone());
        assert!(classifier.predict(&features()).is_err());

        std::fs::write(&path, SAMPLE_FOREST).unwrap();
        assert_eq!(classifier.predict(&features()).unwrap().as_str(), "Healthy");
    }

    #[test]
    fn loaded_artifact_is_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model.json");
        std::fs::write(&path, SAMPLE_FOREST).unwrap();
        let classifier = ArtifactClassifier::new(path.clone());
        assert!(classifier.probe());

        std::fs::remove_file(&path).unwrap();
        assert_eq!(classifier.predict(&features()).unwrap().as_str(), "Healthy");
    }

    #[test]
    fn corrupt_artifact_is_an_error_not_a_panic() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model.json");
        std::fs::write(&path, "{not json").unwrap();
        let classifier = ArtifactClassifier::new(path);
        let prediction: Prediction = classifier.predict(&features()).into();
        assert!(matches!(prediction, Prediction::Error { .. }));
    }

    #[test]
    fn mock_classifier_outcomes() {
        assert_eq!(
            MockClassifier::returning("Flu").predict(&features()).unwrap().as_str(),
            "Flu"
        );
        assert!(matches!(
            MockClassifier::missing().predict(&features()),
            Err(ClassifierError::ArtifactMissing(_))
        ));
    }
}
