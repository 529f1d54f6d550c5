use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::fallback::{fallback_narrative, FallbackBackend};
use super::gemini::{GeminiBackend, GEMINI_BASE_URL};
use super::openai::{OpenAiCompatibleBackend, GROQ_BASE_URL, OPENAI_BASE_URL};
use super::prompt::build_prompt;
use super::{LlmBackend, NarrativeError, NarrativeResult};
use crate::config::LlmCredentials;
use crate::models::{NarrativeProvider, PatientInput};

/// Base URLs of the LLM APIs.
#[derive(Debug, Clone)]
pub struct LlmEndpoints {
    pub groq: String,
    pub google: String,
    pub openai: String,
}

impl Default for LlmEndpoints {
    fn default() -> Self {
        Self {
            groq: GROQ_BASE_URL.to_string(),
            google: GEMINI_BASE_URL.to_string(),
            openai: OPENAI_BASE_URL.to_string(),
        }
    }
}

enum BackendSource {
    Remote {
        client: reqwest::Client,
        credentials: LlmCredentials,
        endpoints: LlmEndpoints,
    },
    Fixed(Arc<dyn LlmBackend>),
}

/// Picks a backend for the requested provider, runs it under a timeout and
/// substitutes the fallback narrative on any failure.
pub struct NarrativeGenerator {
    source: BackendSource,
    timeout: Duration,
}

impl NarrativeGenerator {
    pub fn new(
        client: reqwest::Client,
        credentials: LlmCredentials,
        endpoints: LlmEndpoints,
        timeout: Duration,
    ) -> Self {
        Self {
            source: BackendSource::Remote {
                client,
                credentials,
                endpoints,
            },
            timeout,
        }
    }

    /// Use one backend for every provider key.
    pub fn with_backend(backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self {
            source: BackendSource::Fixed(backend),
            timeout,
        }
    }

    /// Resolve a provider key. Unknown keys and missing credentials resolve
    /// to `FallbackBackend`.
    pub fn backend_for(&self, provider: &str) -> Arc<dyn LlmBackend> {
        let (client, credentials, endpoints) = match &self.source {
            BackendSource::Fixed(backend) => return Arc::clone(backend),
            BackendSource::Remote {
                client,
                credentials,
                endpoints,
            } => (client, credentials, endpoints),
        };

        let parsed = NarrativeProvider::from_str(provider.trim().to_lowercase().as_str()).ok();
        match parsed {
            Some(NarrativeProvider::Groq) => match &credentials.groq {
                Some(key) => Arc::new(OpenAiCompatibleBackend::groq(client.clone(), &endpoints.groq, key)),
                None => Arc::new(FallbackBackend::new(provider)),
            },
            Some(NarrativeProvider::Google) => match &credentials.google {
                Some(key) => Arc::new(GeminiBackend::new(client.clone(), &endpoints.google, key)),
                None => Arc::new(FallbackBackend::new(provider)),
            },
            Some(NarrativeProvider::Openai) => match &credentials.openai {
                Some(key) => Arc::new(OpenAiCompatibleBackend::openai(
                    client.clone(),
                    &endpoints.openai,
                    key,
                )),
                None => Arc::new(FallbackBackend::new(provider)),
            },
            Some(NarrativeProvider::Fallback) | None => Arc::new(FallbackBackend::new(provider)),
        }
    }

    pub async fn generate(
        &self,
        symptoms: &[String],
        patient: &PatientInput,
        provider: &str,
        model_suggestion: Option<&str>,
    ) -> NarrativeResult {
        let backend = self.backend_for(provider);
        let prompt = build_prompt(symptoms, patient, model_suggestion);

        let outcome = match tokio::time::timeout(self.timeout, backend.complete(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(NarrativeError::Timeout(self.timeout.as_secs())),
        };

        match outcome {
            Ok(analysis) => {
                tracing::info!(provider = %backend.provider(), "Narrative generated");
                NarrativeResult {
                    success: true,
                    analysis,
                    provider: backend.provider(),
                    timestamp: Utc::now(),
                }
            }
            Err(NarrativeError::NotConfigured(requested)) => {
                tracing::info!(provider = %requested, "No LLM backend configured, using fallback narrative");
                fallback_narrative(symptoms, patient)
            }
            Err(e) => {
                tracing::warn!(provider = %backend.provider(), error = %e, "LLM call failed, using fallback narrative");
                fallback_narrative(symptoms, patient)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::narrative::MockLlmBackend;

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

    fn symptoms() -> Vec<String> {
        vec!["fever".into(), "cough".into()]
    }

    fn remote(credentials: LlmCredentials) -> NarrativeGenerator {
        NarrativeGenerator::new(
            reqwest::Client::new(),
            credentials,
            LlmEndpoints::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn missing_key_falls_back() {
        let generator = remote(LlmCredentials::default());
        let result = generator.generate(&symptoms(), &patient(), "groq", Some("Flu")).await;
        assert!(!result.success);
        assert_eq!(result.provider, NarrativeProvider::Fallback);
        assert!(result.analysis.contains("45"));
        assert!(result.analysis.contains("140"));
        assert!(result.analysis.contains("110"));
        assert!(result.analysis.contains("85"));
    }

    #[test]
    fn unknown_provider_selects_fallback() {
        let generator = remote(LlmCredentials {
            groq: Some("k".into()),
            google: Some("k".into()),
            openai: Some("k".into()),
        });
        assert_eq!(generator.backend_for("claude").provider(), NarrativeProvider::Fallback);
        assert_eq!(generator.backend_for("fallback").provider(), NarrativeProvider::Fallback);
        assert_eq!(generator.backend_for("GROQ").provider(), NarrativeProvider::Groq);
        assert_eq!(generator.backend_for("google").provider(), NarrativeProvider::Google);
        assert_eq!(generator.backend_for("openai").provider(), NarrativeProvider::Openai);
    }

    #[test]
    fn key_for_other_provider_does_not_help() {
        let generator = remote(LlmCredentials {
            google: Some("k".into()),
            ..Default::default()
        });
        assert_eq!(generator.backend_for("openai").provider(), NarrativeProvider::Fallback);
    }

    #[tokio::test]
    async fn successful_backend_returns_its_text() {
        let backend = Arc::new(MockLlmBackend::new(NarrativeProvider::Groq, "Primary: Influenza"));
        let generator = NarrativeGenerator::with_backend(backend.clone(), Duration::from_secs(5));
        let result = generator.generate(&symptoms(), &patient(), "groq", Some("Flu")).await;
        assert!(result.success);
        assert_eq!(result.provider, NarrativeProvider::Groq);
        assert_eq!(result.analysis, "Primary: Influenza");

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("suggested: Flu"));
    }

    #[tokio::test]
    async fn backend_failure_falls_back() {
        let backend = Arc::new(MockLlmBackend::failing(NarrativeProvider::Openai, "boom"));
        let generator = NarrativeGenerator::with_backend(backend, Duration::from_secs(5));
        let result = generator.generate(&symptoms(), &patient(), "openai", None).await;
        assert!(!result.success);
        assert_eq!(result.provider, NarrativeProvider::Fallback);
    }

    struct StallingBackend;

    #[async_trait::async_trait]
    impl LlmBackend for StallingBackend {
        fn provider(&self) -> NarrativeProvider {
            NarrativeProvider::Google
        }

        async fn complete(&self, _prompt: &str) -> Result<String, NarrativeError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn timeout_falls_back() {
        let generator =
            NarrativeGenerator::with_backend(Arc::new(StallingBackend), Duration::from_millis(50));
        let result = generator.generate(&symptoms(), &patient(), "google", None).await;
        assert_eq!(result.provider, NarrativeProvider::Fallback);
    }
}
