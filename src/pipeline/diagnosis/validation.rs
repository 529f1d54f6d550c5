use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::models::PatientInput;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_SYMPTOMS_CHARS: usize = 500;

/// Raw diagnosis form as submitted. Numeric fields arrive as strings or
/// JSON numbers; both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub glucose: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub heart_rate: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symptoms: String,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Rejection reasons; the display text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("Please enter valid numbers for age, blood pressure, glucose, and heart rate")]
    NotANumber,

    #[error("Please enter a valid age")]
    Age,

    #[error("Please enter a valid blood pressure (50-250)")]
    BloodPressure,

    #[error("Please enter a valid glucose level (50-500)")]
    Glucose,

    #[error("Please enter a valid heart rate (40-200)")]
    HeartRate,
}

/// Check an open interval (both bounds excluded) and narrow to `u32`.
fn within(value: i64, low: i64, high: i64, err: ValidationError) -> Result<u32, ValidationError> {
    if value > low && value < high {
        u32::try_from(value).map_err(|_| err)
    } else {
        Err(err)
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn validate_patient_form(form: &PatientForm) -> Result<PatientInput, ValidationError> {
    let name = form.name.trim();
    let age = form.age.trim();
    let gender = form.gender.trim();
    let bp = form.bp.trim();
    let glucose = form.glucose.trim();
    let heart_rate = form.heart_rate.trim();
    let symptoms = form.symptoms.trim();

    if [name, age, gender, bp, glucose, heart_rate, symptoms]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(ValidationError::MissingFields);
    }

    let parse = |s: &str| s.parse::<i64>().map_err(|_| ValidationError::NotANumber);
    let (age, bp, glucose, heart_rate) = (parse(age)?, parse(bp)?, parse(glucose)?, parse(heart_rate)?);

    Ok(PatientInput {
        name: truncate(name, MAX_NAME_CHARS),
        age: within(age, 0, 150, ValidationError::Age)?,
        gender: gender.to_string(),
        bp: within(bp, 50, 250, ValidationError::BloodPressure)?,
        glucose: within(glucose, 50, 500, ValidationError::Glucose)?,
        heart_rate: within(heart_rate, 40, 200, ValidationError::HeartRate)?,
        symptoms: truncate(symptoms, MAX_SYMPTOMS_CHARS),
    })
}
