use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmBackend, NarrativeError};
use crate::models::NarrativeProvider;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";
const TEMPERATURE: f32 = 0.3;

/// Chat-completions client for OpenAI and OpenAI-compatible APIs (Groq).
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    provider: NarrativeProvider,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleBackend {
    pub fn groq(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            provider: NarrativeProvider::Groq,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: GROQ_MODEL.to_string(),
            max_tokens: Some(2048),
        }
    }

    pub fn openai(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            provider: NarrativeProvider::Openai,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: OPENAI_MODEL.to_string(),
            max_tokens: None,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    fn provider(&self) -> NarrativeProvider {
        self.provider
    }

    async fn complete(&self, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NarrativeError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(NarrativeError::EmptyResponse)
    }
}
