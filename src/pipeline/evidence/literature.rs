use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{read_json, EvidenceError, EvidenceItem, EvidenceLookup};
use crate::models::EvidenceSource;

pub const PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_AUTHORS: usize = 3;

/// PubMed article lookup via the NCBI E-utilities (esearch then esummary).
pub struct PubMedLookup {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl PubMedLookup {
    pub fn new(client: reqwest::Client, base_url: &str, max_results: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results,
        }
    }

    async fn search_ids(&self, condition: &str) -> Result<Vec<String>, EvidenceError> {
        let term = format!("{condition}[Title/Abstract]");
        let retmax = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/esearch.fcgi", self.base_url))
            .query(&[
                ("db", "pubmed"),
                ("term", term.as_str()),
                ("retmax", retmax.as_str()),
                ("retmode", "json"),
            ])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;
        let parsed: ESearchResponse = read_json(response).await?;
        Ok(parsed.esearchresult.idlist)
    }

    async fn summarize(&self, ids: &[String]) -> Result<Vec<EvidenceItem>, EvidenceError> {
        let joined = ids.join(",");
        let response = self
            .client
            .get(format!("{}/esummary.fcgi", self.base_url))
            .query(&[("db", "pubmed"), ("id", joined.as_str()), ("retmode", "json")])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;
        let parsed: ESummaryResponse = read_json(response).await?;

        // `result` maps each id to its summary, next to a `uids` list.
        Ok(ids
            .iter()
            .filter_map(|id| parsed.result.get(id).map(|summary| article_item(id, summary)))
            .collect())
    }
}

#[derive(Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Deserialize)]
struct ESummaryResponse {
    #[serde(default)]
    result: serde_json::Map<String, Value>,
}

fn str_field(summary: &Value, field: &str) -> String {
    summary
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn article_item(id: &str, summary: &Value) -> EvidenceItem {
    let title = str_field(summary, "title");
    let authors = summary
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .take(MAX_AUTHORS)
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    let mut item = EvidenceItem::text(EvidenceSource::Literature, title.clone());
    item.title = Some(title);
    item.authors = Some(authors);
    item.journal = Some(str_field(summary, "source"));
    item.pub_date = Some(str_field(summary, "pubdate"));
    item.pmid = Some(id.to_string());
    item.url = Some(format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"));
    item
}

#[async_trait]
impl EvidenceLookup for PubMedLookup {
    fn source(&self) -> EvidenceSource {
        EvidenceSource::Literature
    }

    async fn lookup(&self, condition: &str) -> Result<Vec<EvidenceItem>, EvidenceError> {
        let ids = self.search_ids(condition).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(count = ids.len(), "PubMed ids found");
        self.summarize(&ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::evidence::test_support::spawn_server;
    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Calls {
        summary: Arc<AtomicUsize>,
    }

    fn pubmed_router(calls: Calls) -> Router {
        Router::new()
            .route(
                "/esearch.fcgi",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q["db"], "pubmed");
                    assert_eq!(q["retmode"], "json");
                    assert_eq!(q["retmax"], "3");
                    let ids: Vec<&str> = if q["term"] == "Diabetes[Title/Abstract]" {
                        vec!["111", "222"]
                    } else {
                        vec![]
                    };
                    Json(serde_json::json!({ "esearchresult": { "idlist": ids } }))
                }),
            )
            .route(
                "/esummary.fcgi",
                get(
                    |State(calls): State<Calls>, Query(q): Query<HashMap<String, String>>| async move {
                        calls.summary.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(q["id"], "111,222");
                        Json(serde_json::json!({ "result": {
                            "uids": ["111", "222"],
                            "111": {
                                "title": "Glucose control in adults",
                                "authors": [
                                    { "name": "Smith J" }, { "name": "Doe A" },
                                    { "name": "Lee K" }, { "name": "Roe B" }
                                ],
                                "source": "Diabetes Care",
                                "pubdate": "2023 Jan"
                            },
                            "222": { "title": "Insulin therapy", "authors": [], "source": "Lancet", "pubdate": "2021" }
                        }}))
                    },
                ),
            )
            .with_state(calls)
    }

    #[tokio::test]
    async fn two_step_lookup_builds_articles() {
        let calls = Calls::default();
        let base = spawn_server(pubmed_router(calls.clone())).await;
        let lookup = PubMedLookup::new(reqwest::Client::new(), &base, 3);

        let items = lookup.lookup("Diabetes").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content, "Glucose control in adults");
        assert_eq!(items[0].authors.as_deref(), Some("Smith J, Doe A, Lee K"));
        assert_eq!(items[0].journal.as_deref(), Some("Diabetes Care"));
        assert_eq!(items[0].pub_date.as_deref(), Some("2023 Jan"));
        assert_eq!(items[0].pmid.as_deref(), Some("111"));
        assert_eq!(items[0].url.as_deref(), Some("https://pubmed.ncbi.nlm.nih.gov/111/"));
        assert_eq!(items[1].authors.as_deref(), Some(""));
        assert_eq!(calls.summary.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_ids_skip_summary_call() {
        let calls = Calls::default();
        let base = spawn_server(pubmed_router(calls.clone())).await;
        let lookup = PubMedLookup::new(reqwest::Client::new(), &base, 3);

        let items = lookup.lookup("Unknownitis").await.unwrap();
        assert!(items.is_empty());
        assert_eq!(calls.summary.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let router = Router::new().route("/esearch.fcgi", get(|| async { "not json" }));
        let base = spawn_server(router).await;
        let lookup = PubMedLookup::new(reqwest::Client::new(), &base, 3);
        let err = lookup.lookup("Diabetes").await.unwrap_err();
        assert!(matches!(err, EvidenceError::ResponseParsing(_)));
    }
}
