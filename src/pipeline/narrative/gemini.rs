use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmBackend, NarrativeError};
use crate::models::NarrativeProvider;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-pro";

/// Google Gemini `generateContent` client.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn provider(&self) -> NarrativeProvider {
        NarrativeProvider::Google
    }

    async fn complete(&self, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::ResponseParsing(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::evidence::test_support::spawn_server;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};

    #[tokio::test]
    async fn joins_candidate_parts() {
        let router = Router::new().route(
            "/models/*rest",
            post(|Path(rest): Path<String>, headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(rest, "gemini-pro:generateContent");
                assert_eq!(headers["x-goog-api-key"], "g-key");
                assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
                assert!(body["generationConfig"]["temperature"].is_number());
                Json(serde_json::json!({
                    "candidates": [{ "content": { "parts": [{ "text": "Part one. " }, { "text": "Part two." }] } }]
                }))
            }),
        );
        let base = spawn_server(router).await;
        let backend = GeminiBackend::new(reqwest::Client::new(), &base, "g-key");
        assert_eq!(backend.complete("prompt").await.unwrap(), "Part one. Part two.");
    }

    #[tokio::test]
    async fn blocked_prompt_is_empty_response() {
        let router = Router::new().route(
            "/models/*rest",
            post(|| async { Json(serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } })) }),
        );
        let base = spawn_server(router).await;
        let backend = GeminiBackend::new(reqwest::Client::new(), &base, "k");
        assert!(matches!(
            backend.complete("p").await.unwrap_err(),
            NarrativeError::EmptyResponse
        ));
    }
}
