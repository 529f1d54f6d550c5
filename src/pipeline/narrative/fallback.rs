use async_trait::async_trait;
use chrono::Utc;

use super::{LlmBackend, NarrativeError, NarrativeResult};
use crate::models::{NarrativeProvider, PatientInput};

/// Deterministic narrative used whenever no LLM backend answers.
pub fn fallback_narrative(symptoms: &[String], patient: &PatientInput) -> NarrativeResult {
    let analysis = format!(
        "**API Key Required**

To use advanced AI-powered diagnosis, please set up an API key:

**Option 1: Groq (FREE, fast)**
1. Visit https://console.groq.com/keys
2. Create a free API key
3. Set environment variable: GROQ_API_KEY=your_key_here

**Option 2: Google Gemini (FREE)**
1. Visit https://makersuite.google.com/app/apikey
2. Create a free API key
3. Set environment variable: GOOGLE_API_KEY=your_key_here

**Option 3: OpenAI (PAID)**
1. Visit https://platform.openai.com/api-keys
2. Create an API key
3. Set environment variable: OPENAI_API_KEY=your_key_here

**Current Basic Analysis:**
Based on the symptoms: {symptoms}
- Patient Age: {age}
- Blood Pressure: {bp} mmHg
- Glucose: {glucose} mg/dL
- Heart Rate: {heart_rate} bpm

Please configure an API key to get detailed AI-powered diagnosis with differential \
diagnosis, medical references, and treatment recommendations.
",
        symptoms = symptoms.join(", "),
        age = patient.age,
        bp = patient.bp,
        glucose = patient.glucose,
        heart_rate = patient.heart_rate,
    );

    NarrativeResult {
        success: false,
        analysis,
        provider: NarrativeProvider::Fallback,
        timestamp: Utc::now(),
    }
}

/// Stand-in backend selected when the requested provider is unknown or has
/// no credential. Every call reports `NotConfigured`.
pub struct FallbackBackend {
    requested: String,
}

impl FallbackBackend {
    pub fn new(requested: &str) -> Self {
        Self {
            requested: requested.to_string(),
        }
    }
}

#[async_trait]
impl LlmBackend for FallbackBackend {
    fn provider(&self) -> NarrativeProvider {
        NarrativeProvider::Fallback
    }

    async fn complete(&self, _prompt: &str) -> Result<String, NarrativeError> {
        Err(NarrativeError::NotConfigured(self.requested.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> PatientInput {
        PatientInput {
            name: "Jane".into(),
            age: 45,
            gender: "Male".into(),
            bp: 140,
            glucose: 110,
            heart_rate: 85,
            symptoms: "fever, cough".into(),
        }
    }

    #[test]
    fn fallback_lists_vitals_verbatim() {
        let result = fallback_narrative(&["fever".into(), "cough".into()], &patient());
        assert!(!result.success);
        assert_eq!(result.provider, NarrativeProvider::Fallback);
        assert!(result.analysis.contains("Based on the symptoms: fever, cough"));
        assert!(result.analysis.contains("- Patient Age: 45"));
        assert!(result.analysis.contains("- Blood Pressure: 140 mmHg"));
        assert!(result.analysis.contains("- Glucose: 110 mg/dL"));
        assert!(result.analysis.contains("- Heart Rate: 85 bpm"));
        assert!(result.analysis.contains("GROQ_API_KEY"));
    }

    #[test]
    fn fallback_text_is_deterministic() {
        let a = fallback_narrative(&["fever".into()], &patient());
        let b = fallback_narrative(&["fever".into()], &patient());
        assert_eq!(a.analysis, b.analysis);
    }

    #[tokio::test]
    async fn fallback_backend_is_not_configured() {
        let backend = FallbackBackend::new("groq");
        let err = backend.complete("prompt").await.unwrap_err();
        assert!(matches!(err, NarrativeError::NotConfigured(p) if p == "groq"));
    }
}
