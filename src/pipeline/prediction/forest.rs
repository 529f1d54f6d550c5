//! Tree-ensemble artifact: a JSON export of a trained random forest.
//!
//! ```json
//! {
//!   "feature_names": ["age", "gender_numeric", "bp", "glucose", "heart_rate"],
//!   "classes": ["Diabetes", "Healthy"],
//!   "trees": [{ "nodes": [
//!     { "type": "split", "feature": 3, "threshold": 125.0, "left": 1, "right": 2 },
//!     { "type": "leaf", "values": [0.0, 12.0] },
//!     { "type": "leaf", "values": [9.0, 1.0] }
//!   ]}]
//! }
//! ```
//!
//! A split sends `x[feature] <= threshold` left. Each tree votes with its
//! leaf's normalized class distribution; the forest predicts the argmax of
//! the mean, ties going to the lowest class index.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::features::FEATURE_NAMES;
use super::ClassifierError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        values: Vec<f64>,
    },
}

impl ForestArtifact {
    /// Read and validate an artifact. A missing file is reported as
    /// `ArtifactMissing` so callers can tell it apart from a corrupt one.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClassifierError::ArtifactMissing(path.to_path_buf()))
            }
            Err(e) => {
                return Err(ClassifierError::Internal(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let artifact: ForestArtifact = serde_json::from_str(raw)
            .map_err(|e| ClassifierError::InvalidArtifact(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub(crate) fn validate(&self) -> Result<(), ClassifierError> {
        if self.feature_names != FEATURE_NAMES {
            return Err(ClassifierError::InvalidArtifact(format!(
                "feature names {:?} do not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.classes.is_empty() {
            return Err(ClassifierError::InvalidArtifact("no classes".into()));
        }
        if self.trees.is_empty() {
            return Err(ClassifierError::InvalidArtifact("no trees".into()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ClassifierError::InvalidArtifact(format!("tree {t} is empty")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        // Children must point forward: traversal always terminates.
                        let in_range = |c: usize| c > i && c < tree.nodes.len();
                        if *feature >= FEATURE_NAMES.len()
                            || !threshold.is_finite()
                            || !in_range(*left)
                            || !in_range(*right)
                        {
                            return Err(ClassifierError::InvalidArtifact(format!(
                                "tree {t} node {i}: malformed split"
                            )));
                        }
                    }
                    TreeNode::Leaf { values } => {
                        let valid = values.len() == self.classes.len()
                            && values.iter().all(|v| v.is_finite() && *v >= 0.0)
                            && values.iter().sum::<f64>() > 0.0;
                        if !valid {
                            return Err(ClassifierError::InvalidArtifact(format!(
                                "tree {t} node {i}: leaf needs {} non-negative weights",
                                self.classes.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Write the artifact as JSON, replacing any previous file in one rename
    /// so a concurrent `load` never sees a partial write.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string(self).map_err(std::io::Error::other)?;
        let staging = path.with_extension("json.partial");
        std::fs::write(&staging, raw)?;
        std::fs::rename(&staging, path)
    }

    /// Predict the class name for one feature row.
    pub fn predict(&self, features: &[f64; 5]) -> Result<&str, ClassifierError> {
        let mut votes = vec![0.0_f64; self.classes.len()];

        for tree in &self.trees {
            let leaf = tree.leaf_for(features)?;
            let total: f64 = leaf.iter().sum();
            for (vote, weight) in votes.iter_mut().zip(leaf) {
                *vote += weight / total;
            }
        }

        let mut best = 0;
        for (i, vote) in votes.iter().enumerate().skip(1) {
            if *vote > votes[best] {
                best = i;
            }
        }
        Ok(&self.classes[best])
    }
}

impl DecisionTree {
    fn leaf_for(&self, features: &[f64; 5]) -> Result<&[f64], ClassifierError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { values }) => return Ok(values),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => {
                    return Err(ClassifierError::Internal(format!(
                        "node {index} out of range"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two trees over glucose and bp, three classes.
    pub(crate) const SAMPLE_FOREST: &str = r#"{
        "feature_names": ["age", "gender_numeric", "bp", "glucose", "heart_rate"],
        "classes": ["Diabetes", "Healthy", "Hypertension"],
        "trees": [
            { "nodes": [
                { "type": "split", "feature": 3, "threshold": 125.0, "left": 1, "right": 2 },
                { "type": "leaf", "values": [0.0, 8.0, 2.0] },
                { "type": "leaf", "values": [9.0, 1.0, 0.0] }
            ]},
            { "nodes": [
                { "type": "split", "feature": 2, "threshold": 135.0, "left": 1, "right": 2 },
                { "type": "leaf", "values": [1.0, 9.0, 0.0] },
                { "type": "leaf", "values": [0.0, 2.0, 8.0] }
            ]}
        ]
    }"#;

    #[test]
    fn predicts_mean_distribution_argmax() {
        let forest = ForestArtifact::from_json(SAMPLE_FOREST).unwrap();
        // glucose 110 -> [0, .8, .2]; bp 140 -> [0, .2, .8]; mean [0, .5, .5] -> tie -> Healthy
        assert_eq!(forest.predict(&[45.0, 0.0, 140.0, 110.0, 85.0]).unwrap(), "Healthy");
        // glucose 300 -> [.9, .1, 0]; bp 120 -> [.1, .9, 0]; mean [.5, .5, 0] -> tie -> Diabetes
        assert_eq!(forest.predict(&[60.0, 1.0, 120.0, 300.0, 90.0]).unwrap(), "Diabetes");
        // glucose 300, bp 180 -> [.9,.1,0] + [0,.2,.8] -> [.45,.15,.4] -> Diabetes
        assert_eq!(forest.predict(&[60.0, 1.0, 180.0, 300.0, 90.0]).unwrap(), "Diabetes");
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let forest = ForestArtifact::from_json(SAMPLE_FOREST).unwrap();
        // glucose exactly 125 goes left, bp exactly 135 goes left
        assert_eq!(forest.predict(&[30.0, 0.0, 135.0, 125.0, 70.0]).unwrap(), "Healthy");
    }

    #[test]
    fn same_input_same_label() {
        let forest = ForestArtifact::from_json(SAMPLE_FOREST).unwrap();
        let row = [45.0, 0.0, 140.0, 110.0, 85.0];
        let first = forest.predict(&row).unwrap().to_string();
        for _ in 0..10 {
            assert_eq!(forest.predict(&row).unwrap(), first);
        }
    }

    #[test]
    fn rejects_feature_name_mismatch() {
        let raw = SAMPLE_FOREST.replace("gender_numeric", "sex");
        let err = ForestArtifact::from_json(&raw).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidArtifact(_)));
    }

    #[test]
    fn rejects_backward_child_pointer() {
        let raw = SAMPLE_FOREST.replacen("\"left\": 1", "\"left\": 0", 1);
        assert!(ForestArtifact::from_json(&raw).is_err());
    }

    #[test]
    fn rejects_leaf_with_wrong_width() {
        let raw = SAMPLE_FOREST.replacen("[0.0, 8.0, 2.0]", "[0.0, 8.0]", 1);
        assert!(ForestArtifact::from_json(&raw).is_err());
    }

    #[test]
    fn save_then_load_predicts_the_same() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model").join("forest.json");
        let forest = ForestArtifact::from_json(SAMPLE_FOREST).unwrap();
        forest.save(&path).unwrap();

        let loaded = ForestArtifact::load(&path).unwrap();
        assert_eq!(loaded.classes, forest.classes);
        let row = [60.0, 1.0, 180.0, 300.0, 90.0];
        assert_eq!(loaded.predict(&row).unwrap(), forest.predict(&row).unwrap());
        assert!(!path.with_extension("json.partial").exists());
    }

    #[test]
    fn missing_file_is_artifact_missing() {
        let err = ForestArtifact::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::ArtifactMissing(_)));
    }
}
