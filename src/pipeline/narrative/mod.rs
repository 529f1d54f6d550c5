//! LLM-written differential-diagnosis narrative with a deterministic
//! templated fallback.

pub mod fallback;
pub mod gemini;
pub mod generator;
pub mod openai;
pub mod prompt;

pub use fallback::{fallback_narrative, FallbackBackend};
pub use gemini::GeminiBackend;
pub use generator::*;
pub use openai::OpenAiCompatibleBackend;
pub use prompt::build_prompt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::timestamp;
use crate::models::NarrativeProvider;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("No credential configured for {0}")]
    NotConfigured(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("LLM API returned error (status {status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("LLM returned an empty completion")]
    EmptyResponse,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),
}

/// Narrative as stored on an advanced diagnosis record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeResult {
    pub success: bool,
    pub analysis: String,
    pub provider: NarrativeProvider,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// LLM backend abstraction (allows mocking)
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn provider(&self) -> NarrativeProvider;

    async fn complete(&self, prompt: &str) -> Result<String, NarrativeError>;
}

/// Mock backend for testing: returns a configured completion or failure.
pub struct MockLlmBackend {
    provider: NarrativeProvider,
    response: Result<String, String>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockLlmBackend {
    pub fn new(provider: NarrativeProvider, response: &str) -> Self {
        Self {
            provider,
            response: Ok(response.to_string()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: NarrativeProvider, reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            ..Self::new(provider, "")
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for MockLlmBackend {
    fn provider(&self) -> NarrativeProvider {
        self.provider
    }

    async fn complete(&self, prompt: &str) -> Result<String, NarrativeError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.response
            .clone()
            .map_err(NarrativeError::HttpClient)
    }
}
