use serde::{Deserialize, Serialize};

/// Validated patient vitals and symptoms.
///
/// Only `validation::validate_patient_form` builds these from untrusted
/// input, so the numeric ranges can be assumed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInput {
    pub name: String,
    pub age: u32,
    /// As entered. Expected "male"/"female", any casing.
    pub gender: String,
    /// Blood pressure, mmHg.
    pub bp: u32,
    /// Glucose, mg/dL.
    pub glucose: u32,
    /// Heart rate, bpm.
    pub heart_rate: u32,
    /// Free text, comma separated.
    pub symptoms: String,
}

impl PatientInput {
    /// Split the free-text symptoms on commas, dropping blanks.
    pub fn symptom_list(&self) -> Vec<String> {
        self.symptoms
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(symptoms: &str) -> PatientInput {
        PatientInput {
            name: "Test".into(),
            age: 45,
            gender: "Male".into(),
            bp: 140,
            glucose: 110,
            heart_rate: 85,
            symptoms: symptoms.into(),
        }
    }

    #[test]
    fn symptom_list_trims_and_drops_blanks() {
        let list = patient(" fever, cough ,, headache ,").symptom_list();
        assert_eq!(list, vec!["fever", "cough", "headache"]);
    }

    #[test]
    fn empty_symptoms_give_empty_list() {
        assert!(patient("  ").symptom_list().is_empty());
    }
}
