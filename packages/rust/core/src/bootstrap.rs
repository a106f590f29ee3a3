//! Wiring live collaborators from configuration.

use std::sync::Arc;

use tracing::info;

use compete_analyst::{Analyst, AnthropicClient};
use compete_extractor::Extractor;
use compete_search::GoogleSearch;
use compete_shared::{
    AppConfig, Depth, DiscoveryMode, Limiters, Result, resolve_api_key, resolve_search_credentials,
};

use crate::pipeline::Pipeline;

/// Build a pipeline backed by the Anthropic API, the HTTP extractor and,
/// in search discovery mode, Google Custom Search.
///
/// Fails with `UpstreamConfig` when a required credential is missing.
/// `limiters` should be built once per process and shared.
pub fn build_pipeline(config: &AppConfig, limiters: &Limiters, depth: Depth) -> Result<Pipeline> {
    let api_key = resolve_api_key(config)?;
    let provider = AnthropicClient::new(&config.anthropic, api_key)?;
    let max_tokens = depth.max_output_tokens().min(config.anthropic.max_tokens);
    let analyst = Analyst::new(Arc::new(provider), limiters.llm.clone()).with_max_tokens(max_tokens);

    let extractor = Extractor::new(&config.scraper, limiters.scraping.clone())?;
    let pipeline = Pipeline::new(Arc::new(extractor), analyst);

    let pipeline = match config.defaults.discovery {
        DiscoveryMode::Search => {
            let credentials = resolve_search_credentials(config)?;
            let search = GoogleSearch::new(&config.search, credentials, limiters.search.clone())?;
            pipeline.with_search(Arc::new(search), config.search.results_per_query as usize)
        }
        DiscoveryMode::Inference => pipeline,
    };

    info!(
        model = %config.anthropic.model,
        ?depth,
        max_tokens,
        discovery = ?pipeline.discovery_mode(),
        "pipeline ready"
    );
    Ok(pipeline)
}
