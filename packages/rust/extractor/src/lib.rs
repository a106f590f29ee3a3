//! Content extraction for compete.
//!
//! Turns a URL into a bounded [`ScrapedContent`] bundle. [`PageSource`] is the
//! seam the pipeline depends on; [`Extractor`] is the live HTTP
//! implementation and [`StaticPages`] a canned one for tests and demos.

pub mod engine;
pub mod page;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;
use url::Url;

use compete_shared::{CompeteError, Result, ScrapedContent};

pub use engine::Extractor;
pub use page::{RAW_TEXT_LIMIT, parse_page, truncate_chars};

/// Anything that can turn a URL into [`ScrapedContent`].
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Extract one page. Fails with [`CompeteError::Fetch`].
    async fn extract(&self, url: &str) -> Result<ScrapedContent>;

    /// Extract all `urls` concurrently.
    ///
    /// Failed URLs are logged and left out of the map; nothing propagates.
    async fn extract_many(&self, urls: &[String]) -> HashMap<String, ScrapedContent> {
        let tasks = urls.iter().map(|url| async move { (url, self.extract(url).await) });

        let mut pages = HashMap::with_capacity(urls.len());
        for (url, result) in join_all(tasks).await {
            match result {
                Ok(content) => {
                    pages.insert(url.clone(), content);
                }
                Err(e) => warn!(url = %url, error = %e, "extraction failed, dropping page"),
            }
        }
        pages
    }
}

/// In-memory [`PageSource`] keyed by exact URL string.
#[derive(Debug, Default, Clone)]
pub struct StaticPages {
    pages: HashMap<String, ScrapedContent>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register parsed content for `url`.
    pub fn with_page(mut self, content: ScrapedContent) -> Self {
        self.pages.insert(content.url.clone(), content);
        self
    }

    /// Register raw HTML for `url`; parsed the same way live pages are.
    /// Unparseable URLs are ignored.
    pub fn with_html(self, url: &str, html: &str) -> Self {
        match Url::parse(url) {
            Ok(base) => self.with_page(parse_page(html, url, &base)),
            Err(_) => self,
        }
    }
}

#[async_trait]
impl PageSource for StaticPages {
    async fn extract(&self, url: &str) -> Result<ScrapedContent> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| CompeteError::fetch(url, "no page registered"))
    }
}
