use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    DuckDuckGoLookup, EvidenceBundle, EvidenceItem, EvidenceLookup, PubMedLookup, WikipediaLookup,
};
use crate::config::AppConfig;
use crate::models::timestamp;

/// Base URLs of the three remote sources.
#[derive(Debug, Clone)]
pub struct EvidenceEndpoints {
    pub web: String,
    pub encyclopedia: String,
    pub literature: String,
}

impl Default for EvidenceEndpoints {
    fn default() -> Self {
        Self {
            web: super::web::DUCKDUCKGO_BASE_URL.to_string(),
            encyclopedia: super::encyclopedia::WIKIPEDIA_BASE_URL.to_string(),
            literature: super::literature::PUBMED_BASE_URL.to_string(),
        }
    }
}

/// Result of a standalone condition search.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionSearch {
    pub condition: String,
    #[serde(flatten)]
    pub evidence: EvidenceBundle,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Runs the three lookups concurrently, each under its own timeout.
pub struct EvidenceAggregator {
    web: Arc<dyn EvidenceLookup>,
    encyclopedia: Arc<dyn EvidenceLookup>,
    literature: Arc<dyn EvidenceLookup>,
    lookup_timeout: Duration,
}

impl EvidenceAggregator {
    pub fn new(
        web: Arc<dyn EvidenceLookup>,
        encyclopedia: Arc<dyn EvidenceLookup>,
        literature: Arc<dyn EvidenceLookup>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            web,
            encyclopedia,
            literature,
            lookup_timeout,
        }
    }

    /// Production sources sharing one HTTP client.
    pub fn from_config(
        client: reqwest::Client,
        config: &AppConfig,
        endpoints: &EvidenceEndpoints,
    ) -> Self {
        Self::new(
            Arc::new(DuckDuckGoLookup::new(client.clone(), &endpoints.web)),
            Arc::new(WikipediaLookup::new(client.clone(), &endpoints.encyclopedia)),
            Arc::new(PubMedLookup::new(
                client,
                &endpoints.literature,
                config.literature_max_results,
            )),
            config.lookup_timeout,
        )
    }

    pub async fn gather(&self, condition: &str) -> EvidenceBundle {
        let (web_search, encyclopedia, literature) = tokio::join!(
            self.run(self.web.as_ref(), condition),
            self.run(self.encyclopedia.as_ref(), condition),
            self.run(self.literature.as_ref(), condition),
        );

        EvidenceBundle {
            web_search,
            encyclopedia: encyclopedia.into_iter().next(),
            literature,
        }
    }

    pub async fn search_condition(&self, condition: &str) -> ConditionSearch {
        tracing::info!(condition, "Condition search");
        ConditionSearch {
            condition: condition.to_string(),
            evidence: self.gather(condition).await,
            timestamp: Utc::now(),
        }
    }

    async fn run(&self, lookup: &dyn EvidenceLookup, condition: &str) -> Vec<EvidenceItem> {
        let source = lookup.source();
        match tokio::time::timeout(self.lookup_timeout, lookup.lookup(condition)).await {
            Ok(Ok(items)) => {
                tracing::debug!(source = %source, count = items.len(), "Evidence lookup done");
                items
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %source, error = %e, "Evidence lookup failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    source = %source,
                    timeout_secs = self.lookup_timeout.as_secs_f64(),
                    "Evidence lookup timed out"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvidenceSource;
    use crate::pipeline::evidence::MockLookup;

    fn aggregator(
        web: MockLookup,
        encyclopedia: MockLookup,
        literature: MockLookup,
        timeout: Duration,
    ) -> EvidenceAggregator {
        EvidenceAggregator::new(Arc::new(web), Arc::new(encyclopedia), Arc::new(literature), timeout)
    }

    #[tokio::test]
    async fn gathers_all_sources() {
        let agg = aggregator(
            MockLookup::returning(EvidenceSource::Web, &["web text"]),
            MockLookup::returning(EvidenceSource::Encyclopedia, &["Page: Flu\nSummary: ..."]),
            MockLookup::returning(EvidenceSource::Literature, &["a", "b"]),
            Duration::from_secs(5),
        );
        let bundle = agg.gather("Flu").await;
        assert_eq!(bundle.web_search.len(), 1);
        assert!(bundle.encyclopedia.is_some());
        assert_eq!(bundle.literature.len(), 2);
    }

    #[tokio::test]
    async fn failing_source_is_isolated() {
        let agg = aggregator(
            MockLookup::failing(EvidenceSource::Web),
            MockLookup::failing(EvidenceSource::Encyclopedia),
            MockLookup::returning(EvidenceSource::Literature, &["article"]),
            Duration::from_secs(5),
        );
        let bundle = agg.gather("Flu").await;
        assert!(bundle.web_search.is_empty());
        assert!(bundle.encyclopedia.is_none());
        assert_eq!(bundle.literature[0].content, "article");
    }

    #[tokio::test]
    async fn slow_source_times_out_alone() {
        let agg = aggregator(
            MockLookup::returning(EvidenceSource::Web, &["fast"]),
            MockLookup::returning(EvidenceSource::Encyclopedia, &["slow"])
                .with_delay(Duration::from_secs(30)),
            MockLookup::returning(EvidenceSource::Literature, &[]),
            Duration::from_millis(100),
        );
        let started = std::time::Instant::now();
        let bundle = agg.gather("Flu").await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(bundle.web_search[0].content, "fast");
        assert!(bundle.encyclopedia.is_none());
    }

    #[tokio::test]
    async fn lookups_run_concurrently() {
        let delay = Duration::from_millis(300);
        let agg = aggregator(
            MockLookup::returning(EvidenceSource::Web, &["w"]).with_delay(delay),
            MockLookup::returning(EvidenceSource::Encyclopedia, &["e"]).with_delay(delay),
            MockLookup::returning(EvidenceSource::Literature, &["l"]).with_delay(delay),
            Duration::from_secs(5),
        );
        let started = std::time::Instant::now();
        let bundle = agg.gather("Flu").await;
        assert!(started.elapsed() < Duration::from_millis(800));
        assert!(!bundle.is_empty());
    }

    #[tokio::test]
    async fn condition_search_serializes_flat() {
        let agg = aggregator(
            MockLookup::returning(EvidenceSource::Web, &["w"]),
            MockLookup::returning(EvidenceSource::Encyclopedia, &[]),
            MockLookup::returning(EvidenceSource::Literature, &[]),
            Duration::from_secs(5),
        );
        let result = agg.search_condition("Asthma").await;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["condition"], "Asthma");
        assert_eq!(json["web_search"][0]["content"], "w");
        assert!(json["encyclopedia"].is_null());
        assert!(json["timestamp"].is_string());
    }
}
