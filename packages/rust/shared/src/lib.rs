//! Shared types, error model, and configuration for compete.
//!
//! This crate is the foundation depended on by all other compete crates.
//! It provides:
//! - [`CompeteError`]: the unified error type
//! - Domain types ([`BusinessProfile`], [`Competitor`], [`CompetitorAnalysis`], ...)
//! - Configuration ([`AppConfig`], config loading, credential lookup)
//! - The URL guard ([`validate_public_url`]) and the shared rate limiters ([`Limiters`])

pub mod config;
pub mod error;
pub mod throttle;
pub mod types;
pub mod urls;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, DefaultsConfig, LimitConfig, LimitsConfig, ScraperConfig,
    SearchConfig, SearchCredentials, ServerConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key, resolve_search_credentials,
};
pub use error::{CompeteError, Result};
pub use throttle::{Limiters, Throttle};
pub use types::{
    BusinessProfile, Competitor, CompetitorAnalysis, CompetitorCandidate, Depth, DiscoveryMode,
    Level, MarketAnalysis, MarketSegment, Opportunity, PageLink, Recommendation, ScrapedContent,
    SearchResult, StrategicRecommendations, TargetContent, Threat,
};
pub use urls::{
    bare_host, is_guarded_target, normalize_url, validate_competitor_count, validate_public_url,
};
