use serde::Serialize;

use crate::models::PatientInput;

/// Column order the artifact must declare.
pub const FEATURE_NAMES: [&str; 5] = ["age", "gender_numeric", "bp", "glucose", "heart_rate"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub age: f64,
    pub gender_numeric: u8,
    pub bp: f64,
    pub glucose: f64,
    pub heart_rate: f64,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.age,
            f64::from(self.gender_numeric),
            self.bp,
            self.glucose,
            self.heart_rate,
        ]
    }
}

/// "female" (any casing) encodes to 1. Everything else, including unknown
/// or empty values, encodes to 0 like "male" does.
pub fn gender_code(gender: &str) -> u8 {
    match gender.trim().to_lowercase().as_str() {
        "female" => 1,
        _ => 0,
    }
}

pub fn encode(patient: &PatientInput) -> FeatureVector {
    FeatureVector {
        age: f64::from(patient.age),
        gender_numeric: gender_code(&patient.gender),
        bp: f64::from(patient.bp),
        glucose: f64::from(patient.glucose),
        heart_rate: f64::from(patient.heart_rate),
    }
}
