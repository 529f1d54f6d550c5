use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{read_json, truncate_chars, EvidenceError, EvidenceItem, EvidenceLookup};
use crate::models::EvidenceSource;

pub const WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";
const MAX_CHARS: usize = 800;
const MAX_PAGES: usize = 3;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wikipedia search plus intro extracts of the top hits.
pub struct WikipediaLookup {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaLookup {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url)
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, EvidenceError> {
        let limit = MAX_PAGES.to_string();
        let response = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;
        let parsed: SearchResponse = read_json(response).await?;
        Ok(parsed.query.search.into_iter().map(|hit| hit.title).collect())
    }

    async fn fetch_extracts(&self, titles: &[String]) -> Result<Vec<(String, String)>, EvidenceError> {
        let joined = titles.join("|");
        let response = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("titles", joined.as_str()),
                ("format", "json"),
            ])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;
        let parsed: ExtractsResponse = read_json(response).await?;

        let mut by_title: HashMap<String, String> = parsed
            .query
            .pages
            .into_values()
            .filter_map(|page| page.extract.map(|extract| (page.title, extract)))
            .collect();

        // Keep search ranking; the pages map is keyed by page id.
        Ok(titles
            .iter()
            .filter_map(|title| {
                by_title
                    .remove(title)
                    .filter(|extract| !extract.trim().is_empty())
                    .map(|extract| (title.clone(), extract))
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: SearchQuery,
}

#[derive(Deserialize, Default)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct ExtractsResponse {
    #[serde(default)]
    query: ExtractsQuery,
}

#[derive(Deserialize, Default)]
struct ExtractsQuery {
    #[serde(default)]
    pages: HashMap<String, WikiPage>,
}

#[derive(Deserialize)]
struct WikiPage {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}

#[async_trait]
impl EvidenceLookup for WikipediaLookup {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::Encyclopedia
    }

    async fn lookup(&self, condition: &str) -> Result<Vec<EvidenceItem>, EvidenceError> {
        let query = format!("{condition} medical condition");
        let titles = self.search_titles(&query).await?;
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let pages = self.fetch_extracts(&titles).await?;
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let text = pages
            .iter()
            .map(|(title, extract)| format!("Page: {title}\nSummary: {}", extract.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut item =
            EvidenceItem::text(EvidenceSource::Encyclopedia, truncate_chars(&text, MAX_CHARS));
        item.title = pages.first().map(|(title, _)| title.clone());
        Ok(vec![item])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::evidence::test_support::spawn_server;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};

    async fn wiki_api(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        if q.get("list").map(String::as_str) == Some("search") {
            if q["srsearch"] == "Unknownitis medical condition" {
                return Json(serde_json::json!({ "query": { "search": [] } }));
            }
            assert_eq!(q["srsearch"], "Asthma medical condition");
            assert_eq!(q["srlimit"], "3");
            return Json(serde_json::json!({
                "query": { "search": [{ "title": "Asthma" }, { "title": "Status asthmaticus" }] }
            }));
        }
        Json(serde_json::json!({
            "query": { "pages": {
                "222": { "title": "Status asthmaticus", "extract": "A severe exacerbation." },
                "111": { "title": "Asthma", "extract": "Asthma is a long-term inflammatory disease." }
            }}
        }))
    }

    #[tokio::test]
    async fn formats_pages_in_search_order() {
        let base = spawn_server(Router::new().route("/w/api.php", get(wiki_api))).await;
        let lookup = WikipediaLookup::new(reqwest::Client::new(), &base);

        let items = lookup.lookup("Asthma").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].content,
            "Page: Asthma\nSummary: Asthma is a long-term inflammatory disease.\n\n\
             Page: Status asthmaticus\nSummary: A severe exacerbation."
        );
        assert_eq!(items[0].source, EvidenceSource::Encyclopedia);
    }

    #[tokio::test]
    async fn no_search_hits_gives_no_items() {
        let base = spawn_server(Router::new().route("/w/api.php", get(wiki_api))).await;
        let lookup = WikipediaLookup::new(reqwest::Client::new(), &base);
        assert!(lookup.lookup("Unknownitis").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn long_summaries_are_truncated() {
        let router = Router::new().route(
            "/w/api.php",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.contains_key("list") {
                    Json(serde_json::json!({ "query": { "search": [{ "title": "Long" }] } }))
                } else {
                    Json(serde_json::json!({ "query": { "pages": {
                        "1": { "title": "Long", "extract": "y".repeat(2000) }
                    }}}))
                }
            }),
        );
        let base = spawn_server(router).await;
        let lookup = WikipediaLookup::new(reqwest::Client::new(), &base);
        let items = lookup.lookup("Long").await.unwrap();
        assert_eq!(items[0].content.chars().count(), 800);
    }
}
