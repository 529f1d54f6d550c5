use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{read_json, truncate_chars, EvidenceError, EvidenceItem, EvidenceLookup};
use crate::models::EvidenceSource;

pub const DUCKDUCKGO_BASE_URL: &str = "https://api.duckduckgo.com";
const MAX_CHARS: usize = 500;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// General web search through the DuckDuckGo instant-answer API.
pub struct DuckDuckGoLookup {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoLookup {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic or a named group of topics.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: String,
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

fn collect_topics<'a>(topics: &'a [RelatedTopic], out: &mut Vec<&'a str>) {
    for topic in topics {
        if !topic.text.is_empty() {
            out.push(&topic.text);
        }
        collect_topics(&topic.topics, out);
    }
}

#[async_trait]
impl EvidenceLookup for DuckDuckGoLookup {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::Web
    }

    async fn lookup(&self, condition: &str) -> Result<Vec<EvidenceItem>, EvidenceError> {
        let query = format!("medical condition {condition} symptoms treatment");
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;
        let answer: InstantAnswer = read_json(response).await?;

        let mut parts: Vec<&str> = Vec::new();
        if !answer.abstract_text.is_empty() {
            parts.push(&answer.abstract_text);
        }
        collect_topics(&answer.related_topics, &mut parts);

        let text = parts.join(" ");
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut item = EvidenceItem::text(EvidenceSource::Web, truncate_chars(&text, MAX_CHARS));
        item.title = Some(answer.heading).filter(|h| !h.is_empty());
        item.url = Some(answer.abstract_url).filter(|u| !u.is_empty());
        Ok(vec![item])
    }
}
