//! Application configuration for compete.
//!
//! User config lives at `~/.compete/compete.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompeteError, Result};
use crate::types::{Depth, DiscoveryMode};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "compete.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".compete";

// ---------------------------------------------------------------------------
// Config structs (matching compete.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Anthropic Messages API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Page fetching settings.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Per-dependency rate limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of competitors to discover.
    #[serde(default = "default_competitors")]
    pub competitors: u32,

    /// Analysis depth.
    #[serde(default)]
    pub depth: Depth,

    /// How competitors are discovered.
    #[serde(default)]
    pub discovery: DiscoveryMode,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            competitors: default_competitors(),
            depth: Depth::default(),
            discovery: DiscoveryMode::default(),
        }
    }
}

fn default_competitors() -> u32 {
    5
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,

    /// Model used for every completion.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Ceiling on the output-token budget of any single completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout.
    #[serde(default = "default_anthropic_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_key_env(),
            model: default_model(),
            base_url: default_anthropic_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_anthropic_timeout(),
        }
    }
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_anthropic_timeout() -> u64 {
    120
}

/// `[search]` section (Google Custom Search).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Env var holding the search engine id.
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// Search endpoint.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Domains excluded from every query.
    #[serde(default = "default_excluded_sites")]
    pub excluded_sites: Vec<String>,

    /// Results requested per generated query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id_env: default_engine_id_env(),
            base_url: default_search_base_url(),
            excluded_sites: default_excluded_sites(),
            results_per_query: default_results_per_query(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "GOOGLE_SEARCH_ENGINE_ID".into()
}
fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_excluded_sites() -> Vec<String> {
    [
        "wikipedia.org",
        "linkedin.com",
        "facebook.com",
        "twitter.com",
        "youtube.com",
        "crunchbase.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_results_per_query() -> u32 {
    5
}

/// `[scraper]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Per-page timeout.
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// Redirect hop limit.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent sent with every page request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_scrape_timeout() -> u64 {
    15
}
fn default_max_redirects() -> usize {
    5
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .into()
}

/// One `[limits.*]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum calls in flight.
    pub max_concurrent: usize,
    /// Minimum spacing between call dispatches.
    pub min_interval_ms: u64,
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_llm_limit")]
    pub llm: LimitConfig,

    #[serde(default = "default_search_limit")]
    pub search: LimitConfig,

    #[serde(default = "default_scraping_limit")]
    pub scraping: LimitConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            llm: default_llm_limit(),
            search: default_search_limit(),
            scraping: default_scraping_limit(),
        }
    }
}

fn default_llm_limit() -> LimitConfig {
    LimitConfig {
        max_concurrent: 2,
        min_interval_ms: 500,
    }
}
fn default_search_limit() -> LimitConfig {
    LimitConfig {
        max_concurrent: 2,
        min_interval_ms: 200,
    }
}
fn default_scraping_limit() -> LimitConfig {
    LimitConfig {
        max_concurrent: 3,
        min_interval_ms: 1000,
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.compete/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CompeteError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.compete/compete.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CompeteError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CompeteError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CompeteError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CompeteError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CompeteError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

fn read_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// Read the Anthropic API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.anthropic.api_key_env;
    read_env(var_name).ok_or_else(|| {
        CompeteError::upstream_config(format!(
            "Anthropic API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://console.anthropic.com/"
        ))
    })
}

/// Search API credentials.
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

/// Read the search API key and engine id from their configured env vars.
pub fn resolve_search_credentials(config: &AppConfig) -> Result<SearchCredentials> {
    let key_var = &config.search.api_key_env;
    let engine_var = &config.search.engine_id_env;

    let api_key = read_env(key_var).ok_or_else(|| {
        CompeteError::upstream_config(format!(
            "Search API key not found. Set the {key_var} environment variable."
        ))
    })?;
    let engine_id = read_env(engine_var).ok_or_else(|| {
        CompeteError::upstream_config(format!(
            "Search engine id not found. Set the {engine_var} environment variable."
        ))
    })?;

    Ok(SearchCredentials { api_key, engine_id })
}
