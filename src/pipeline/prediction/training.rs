//! Random-forest training: patient CSV → `ForestArtifact`.
//!
//! CART trees grown on bootstrap samples with gini impurity, each split
//! choosing among a random `sqrt(n_features)` subset first. The RNG is
//! seeded, so the same data and parameters always produce the same forest.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

use super::features::{gender_code, FEATURE_NAMES};
use super::forest::{DecisionTree, ForestArtifact, TreeNode};
use super::ClassifierError;

/// Labelled vitals shipped with the service, used when no artifact exists.
pub const DEFAULT_TRAINING_DATA: &str =
    include_str!("../../../resources/data/sample_patient_data.csv");

/// Share of rows held out for the accuracy estimate.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

const N_FEATURES: usize = FEATURE_NAMES.len();

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Cannot read training data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed training data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("No training samples")]
    NoSamples,

    #[error("Invalid training parameters: {0}")]
    InvalidParams(String),

    #[error("Trained forest failed validation: {0}")]
    Artifact(#[from] ClassifierError),
}

/// One labelled feature row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub features: [f64; N_FEATURES],
    pub label: String,
}

/// Columns read from the CSV; any others (name, symptoms) are ignored.
#[derive(Debug, Deserialize)]
struct PatientRow {
    age: f64,
    gender: String,
    bp: f64,
    glucose: f64,
    heart_rate: f64,
    diagnosis: String,
}

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub train_samples: usize,
    pub test_samples: usize,
    /// Holdout accuracy; `None` when nothing was held out.
    pub accuracy: Option<f64>,
    pub classes: Vec<String>,
}

pub fn read_samples<R: Read>(reader: R) -> Result<Vec<TrainingSample>, TrainingError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (i, result) in csv_reader.deserialize::<PatientRow>().enumerate() {
        let row = result?;
        let line = i + 2; // header is line 1
        let features = [
            row.age,
            f64::from(gender_code(&row.gender)),
            row.bp,
            row.glucose,
            row.heart_rate,
        ];
        if features.iter().any(|v| !v.is_finite()) {
            return Err(TrainingError::InvalidRow {
                row: line,
                reason: "non-finite vital".into(),
            });
        }
        if row.diagnosis.is_empty() {
            return Err(TrainingError::InvalidRow {
                row: line,
                reason: "empty diagnosis".into(),
            });
        }
        samples.push(TrainingSample {
            features,
            label: row.diagnosis,
        });
    }
    Ok(samples)
}

pub fn load_samples(path: &Path) -> Result<Vec<TrainingSample>, TrainingError> {
    let file = std::fs::File::open(path)?;
    read_samples(file)
}

/// Shuffle with `seed` and hold out `test_fraction` of the rows.
pub fn split_holdout(
    mut samples: Vec<TrainingSample>,
    test_fraction: f64,
    seed: u64,
) -> (Vec<TrainingSample>, Vec<TrainingSample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);
    let n_test = ((samples.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    // Always keep at least one row to train on.
    let n_test = n_test.min(samples.len().saturating_sub(1));
    let test = samples.split_off(samples.len() - n_test);
    (samples, test)
}

pub fn accuracy(forest: &ForestArtifact, samples: &[TrainingSample]) -> Result<f64, TrainingError> {
    if samples.is_empty() {
        return Err(TrainingError::NoSamples);
    }
    let mut correct = 0usize;
    for sample in samples {
        if forest.predict(&sample.features)? == sample.label {
            correct += 1;
        }
    }
    Ok(correct as f64 / samples.len() as f64)
}

pub fn train_forest(
    samples: &[TrainingSample],
    params: &ForestParams,
) -> Result<ForestArtifact, TrainingError> {
    if samples.is_empty() {
        return Err(TrainingError::NoSamples);
    }
    if params.n_trees == 0 || params.max_depth == 0 {
        return Err(TrainingError::InvalidParams(
            "n_trees and max_depth must be positive".into(),
        ));
    }

    let classes: Vec<String> = samples
        .iter()
        .map(|s| s.label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let targets: Vec<usize> = samples
        .iter()
        .filter_map(|s| classes.binary_search(&s.label).ok())
        .collect();
    let features: Vec<[f64; N_FEATURES]> = samples.iter().map(|s| s.features).collect();

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut trees = Vec::with_capacity(params.n_trees);
    for _ in 0..params.n_trees {
        let rows: Vec<usize> = (0..samples.len())
            .map(|_| rng.gen_range(0..samples.len()))
            .collect();
        let mut builder = TreeBuilder {
            features: &features,
            targets: &targets,
            n_classes: classes.len(),
            params,
            nodes: Vec::new(),
        };
        builder.grow(&rows, 0, &mut rng);
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }

    let forest = ForestArtifact {
        feature_names: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
        classes,
        trees,
    };
    forest.validate()?;
    Ok(forest)
}

/// Train on a holdout split and report accuracy on the held-out rows.
pub fn train_with_holdout(
    samples: Vec<TrainingSample>,
    params: &ForestParams,
    test_fraction: f64,
) -> Result<(ForestArtifact, TrainingReport), TrainingError> {
    let (train, test) = split_holdout(samples, test_fraction, params.seed);
    let forest = train_forest(&train, params)?;
    let accuracy = if test.is_empty() {
        None
    } else {
        Some(accuracy(&forest, &test)?)
    };
    let report = TrainingReport {
        train_samples: train.len(),
        test_samples: test.len(),
        accuracy,
        classes: forest.classes.clone(),
    };
    Ok((forest, report))
}

/// Train from the bundled sample data with default parameters and save
/// the artifact to `path`.
pub fn train_default_model(path: &Path) -> Result<TrainingReport, TrainingError> {
    let samples = read_samples(DEFAULT_TRAINING_DATA.as_bytes())?;
    let (forest, report) =
        train_with_holdout(samples, &ForestParams::default(), DEFAULT_TEST_FRACTION)?;
    forest.save(path)?;
    Ok(report)
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    features: &'a [[f64; N_FEATURES]],
    targets: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Append the subtree for `rows` in pre-order and return its root index.
    /// Children are always pushed after their parent.
    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(rows);
        let index = self.nodes.len();
        let pure = counts.iter().filter(|c| **c > 0.0).count() <= 1;

        let split = if pure
            || depth >= self.params.max_depth
            || rows.len() < self.params.min_samples_split
        {
            None
        } else {
            self.best_split(rows, &counts, rng)
        };

        let Some(split) = split else {
            self.nodes.push(TreeNode::Leaf { values: counts });
            return index;
        };

        // Placeholder until both children have indices.
        self.nodes.push(TreeNode::Leaf { values: Vec::new() });
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.features[r][split.feature] <= split.threshold);
        let left = self.grow(&left_rows, depth + 1, rng);
        let right = self.grow(&right_rows, depth + 1, rng);
        self.nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &r in rows {
            counts[self.targets[r]] += 1.0;
        }
        counts
    }

    /// Best gini split over a random `sqrt(n)` feature subset, widening to
    /// the remaining features only if the subset has no usable split.
    fn best_split(&self, rows: &[usize], counts: &[f64], rng: &mut StdRng) -> Option<Split> {
        let parent = gini(counts, rows.len() as f64);
        let mut order: Vec<usize> = (0..N_FEATURES).collect();
        order.shuffle(rng);
        let max_features = ((N_FEATURES as f64).sqrt() as usize).max(1);

        let mut best: Option<Split> = None;
        for (tried, &feature) in order.iter().enumerate() {
            if tried >= max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_threshold(rows, counts, feature) {
                if candidate.impurity < parent - 1e-12
                    && best.as_ref().map_or(true, |b| candidate.impurity < b.impurity)
                {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_threshold(&self, rows: &[usize], counts: &[f64], feature: usize) -> Option<Split> {
        if rows.len() < 2 {
            return None;
        }
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_by(|a, b| self.features[*a][feature].total_cmp(&self.features[*b][feature]));

        let total = rows.len() as f64;
        let mut left = vec![0.0; self.n_classes];
        let mut best: Option<Split> = None;

        for i in 0..sorted.len() - 1 {
            left[self.targets[sorted[i]]] += 1.0;
            let here = self.features[sorted[i]][feature];
            let next = self.features[sorted[i + 1]][feature];
            if here >= next {
                continue;
            }
            let n_left = (i + 1) as f64;
            let n_right = total - n_left;
            let right: Vec<f64> = counts.iter().zip(&left).map(|(c, l)| c - l).collect();
            let impurity = (n_left * gini(&left, n_left) + n_right * gini(&right, n_right)) / total;
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next {
                    threshold = here;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}
