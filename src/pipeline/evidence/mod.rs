//! Best-effort medical references for a condition name.
//!
//! Three independent lookups (general web search, Wikipedia, PubMed) each
//! implement `EvidenceLookup`. The aggregator runs them concurrently; a
//! failing or slow source contributes nothing and never fails the request.

pub mod aggregator;
pub mod encyclopedia;
pub mod literature;
pub mod web;

pub use aggregator::*;
pub use encyclopedia::WikipediaLookup;
pub use literature::PubMedLookup;
pub use web::DuckDuckGoLookup;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::timestamp;
use crate::models::EvidenceSource;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl From<reqwest::Error> for EvidenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            EvidenceError::ResponseParsing(e.to_string())
        } else {
            EvidenceError::HttpClient(e.to_string())
        }
    }
}

/// One snippet from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub source: EvidenceSource,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl EvidenceItem {
    pub fn text(source: EvidenceSource, content: String) -> Self {
        Self {
            source,
            content,
            title: None,
            authors: None,
            journal: None,
            pub_date: None,
            pmid: None,
            url: None,
            timestamp: Utc::now(),
        }
    }
}

/// Evidence for one condition, keyed by source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub web_search: Vec<EvidenceItem>,
    pub encyclopedia: Option<EvidenceItem>,
    pub literature: Vec<EvidenceItem>,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.web_search.is_empty() && self.encyclopedia.is_none() && self.literature.is_empty()
    }
}

/// One external evidence source (allows mocking)
#[async_trait]
pub trait EvidenceLookup: Send + Sync {
    fn source(&self) -> EvidenceSource;

    async fn lookup(&self, condition: &str) -> Result<Vec<EvidenceItem>, EvidenceError>;
}

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Check status and decode a JSON body.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, EvidenceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(EvidenceError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| EvidenceError::ResponseParsing(e.to_string()))
}

/// Mock lookup for testing. Returns fixed items or fails, optionally after a delay.
pub struct MockLookup {
    source: EvidenceSource,
    items: Vec<EvidenceItem>,
    fail: bool,
    delay: Option<std::time::Duration>,
}

impl MockLookup {
    pub fn returning(source: EvidenceSource, contents: &[&str]) -> Self {
        Self {
            source,
            items: contents
                .iter()
                .map(|c| EvidenceItem::text(source, c.to_string()))
                .collect(),
            fail: false,
            delay: None,
        }
    }

    pub fn failing(source: EvidenceSource) -> Self {
        Self {
            fail: true,
            ..Self::returning(source, &[])
        }
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl EvidenceLookup for MockLookup {
    fn source(&self) -> EvidenceSource {
        self.source
    }

    async fn lookup(&self, _condition: &str) -> Result<Vec<EvidenceItem>, EvidenceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EvidenceError::HttpClient("mock failure".into()));
        }
        Ok(self.items.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn empty_bundle() {
        assert!(EvidenceBundle::default().is_empty());
        let bundle = EvidenceBundle {
            literature: vec![EvidenceItem::text(EvidenceSource::Literature, "x".into())],
            ..Default::default()
        };
        assert!(!bundle.is_empty());
    }
}
