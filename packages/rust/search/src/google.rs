//! Google Custom Search JSON API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use compete_shared::{CompeteError, Result, SearchConfig, SearchCredentials, SearchResult, Throttle};

use crate::{MAX_RESULTS_PER_QUERY, SearchProvider, rank_score};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// `GET {base_url}?key=..&cx=..&q=..&num=..`, paced by the search throttle.
pub struct GoogleSearch {
    client: Client,
    base_url: String,
    credentials: SearchCredentials,
    excluded_sites: Vec<String>,
    throttle: Throttle,
}

impl GoogleSearch {
    pub fn new(config: &SearchConfig, credentials: SearchCredentials, throttle: Throttle) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .map_err(|e| CompeteError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
            excluded_sites: config.excluded_sites.clone(),
            throttle,
        })
    }

    /// `query` with a `-site:` operator per excluded domain.
    fn full_query(&self, query: &str) -> String {
        let mut full = query.trim().to_string();
        for site in &self.excluded_sites {
            full.push_str(" -site:");
            full.push_str(site);
        }
        full
    }

    async fn fetch(&self, query: &str, num: usize) -> Result<SearchResponse> {
        let num = num.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("cx", self.credentials.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CompeteError::Upstream(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompeteError::Upstream(format!("search API returned {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| CompeteError::Upstream(format!("invalid search response: {e}")))
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let num = max_results.clamp(1, MAX_RESULTS_PER_QUERY);
        let full_query = self.full_query(query);

        let body = self.throttle.run(self.fetch(&full_query, num)).await?;
        let len = body.items.len();
        debug!(results = len, "search returned");

        Ok(body
            .items
            .into_iter()
            .enumerate()
            .map(|(i, item)| SearchResult {
                title: item.title,
                url: item.link,
                content: item.snippet,
                score: Some(rank_score(i, len)),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn google(server: &MockServer) -> GoogleSearch {
        let config = SearchConfig {
            base_url: server.uri(),
            excluded_sites: vec!["wikipedia.org".into(), "linkedin.com".into()],
            ..SearchConfig::default()
        };
        let credentials = SearchCredentials {
            api_key: "k".into(),
            engine_id: "cx1".into(),
        };
        GoogleSearch::new(&config, credentials, Throttle::unlimited("search")).unwrap()
    }

    #[tokio::test]
    async fn sends_exclusions_and_scores_by_rank() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("key", "k"))
            .and(query_param("cx", "cx1"))
            .and(query_param("q", "kanban tools -site:wikipedia.org -site:linkedin.com"))
            .and(query_param("num", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"title": "Beta", "link": "https://beta.io", "snippet": "Boards"},
                    {"title": "Delta", "link": "https://delta.dev", "snippet": "Roadmaps"}
                ]
            })))
            .mount(&server)
            .await;

        let results = google(&server).search("kanban tools", 25).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://beta.io");
        assert_eq!(results[0].score, Some(1.0));
        assert_eq!(results[1].score, Some(0.5));
        assert_eq!(results[1].content, "Roadmaps");
    }

    #[tokio::test]
    async fn missing_items_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        assert!(google(&server).search("nothing", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_errors_are_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let search = google(&server);
        let err = search.search("q", 5).await.unwrap_err();
        assert!(matches!(err, CompeteError::Upstream(_)));

        assert!(search.search_many(&["q".to_string()], 5).await.is_empty());
    }
}
