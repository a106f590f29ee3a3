//! Web search for competitor discovery.
//!
//! [`SearchProvider`] is the seam; [`GoogleSearch`] queries Google Custom
//! Search and [`StaticSearch`] serves canned results.

pub mod google;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use compete_shared::{CompeteError, Result, SearchResult, normalize_url};

pub use google::GoogleSearch;

/// Upper bound on results per query.
pub const MAX_RESULTS_PER_QUERY: usize = 10;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning at most `max_results` (capped at 10) hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    /// Run every query concurrently and merge the hits in query order,
    /// deduplicated by normalized URL.
    ///
    /// A failed query is logged and contributes nothing.
    async fn search_many(&self, queries: &[String], per_query: usize) -> Vec<SearchResult> {
        let tasks = queries
            .iter()
            .map(|query| async move { (query, self.search(query, per_query).await) });

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (query, outcome) in join_all(tasks).await {
            match outcome {
                Ok(results) => {
                    for result in results {
                        if seen.insert(normalize_url(&result.url)) {
                            merged.push(result);
                        }
                    }
                }
                Err(e) => warn!(%query, error = %e, "search query failed, skipping"),
            }
        }

        debug!(queries = queries.len(), results = merged.len(), "search batch complete");
        merged
    }
}

/// Rank-derived relevance: `1 - index / len`, so the first hit scores 1.0.
pub fn rank_score(index: usize, len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    1.0 - index as f64 / len as f64
}

/// In-memory [`SearchProvider`] keyed by exact query text.
#[derive(Debug, Default, Clone)]
pub struct StaticSearch {
    results: HashMap<String, Vec<SearchResult>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        self.results.insert(query.into(), results);
        self
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let results = self
            .results
            .get(query)
            .ok_or_else(|| CompeteError::Upstream(format!("no results registered for {query:?}")))?;
        Ok(results
            .iter()
            .take(max_results.min(MAX_RESULTS_PER_QUERY))
            .cloned()
            .collect())
    }
}
