//! HTTP-backed content extractor.
//!
//! Fetches pages with a browser identity, a bounded timeout and a redirect
//! hop limit, paced by the shared scraping throttle. Every redirect hop is
//! run through the URL guard, not just the first request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};
use url::Url;

use compete_shared::{
    CompeteError, Result, ScrapedContent, ScraperConfig, Throttle, is_guarded_target,
};

use crate::PageSource;
use crate::page::parse_page;

/// Decides whether a URL must not be fetched.
type Guard = Arc<dyn Fn(&Url) -> bool + Send + Sync>;

/// Extracts [`ScrapedContent`] from live web pages.
pub struct Extractor {
    client: Client,
    throttle: Throttle,
    guard: Guard,
}

impl Extractor {
    /// Create an extractor sharing the process-wide scraping `throttle`.
    pub fn new(config: &ScraperConfig, throttle: Throttle) -> Result<Self> {
        Self::with_guard(config, throttle, Arc::new(is_guarded_target))
    }

    fn with_guard(config: &ScraperConfig, throttle: Throttle, guard: Guard) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy(config.max_redirects, guard.clone()))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompeteError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            throttle,
            guard,
        })
    }

    /// Extractor that fetches localhost/private IPs (for mock servers).
    #[cfg(test)]
    fn permissive(config: &ScraperConfig, throttle: Throttle) -> Result<Self> {
        Self::with_guard(config, throttle, Arc::new(|_: &Url| false))
    }

    /// Fetch `url`, returning the final (post-redirect) URL and the body.
    async fn fetch(&self, url: &Url) -> Result<(Url, String)> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CompeteError::fetch(url.as_str(), describe(&e)))?;

        let final_url = response.url().clone();
        if (self.guard)(&final_url) {
            warn!(%url, %final_url, "SSRF protection: redirect target blocked");
            return Err(CompeteError::fetch(url.as_str(), "redirect blocked by URL guard"));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(CompeteError::fetch(url.as_str(), format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CompeteError::fetch(url.as_str(), format!("body read failed: {e}")))?;

        Ok((final_url, body))
    }
}

/// Follow at most `max_redirects` hops, refusing any hop the guard rejects.
fn redirect_policy(max_redirects: usize, guard: Guard) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error(format!("too many redirects (limit {max_redirects})"))
        } else if guard(attempt.url()) {
            let blocked = attempt.url().to_string();
            attempt.error(format!("redirect blocked by URL guard: {blocked}"))
        } else {
            attempt.follow()
        }
    })
}

/// Error text including its source chain; reqwest keeps redirect-policy
/// messages in the source.
fn describe(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[async_trait]
impl PageSource for Extractor {
    #[instrument(skip_all, fields(url = %url))]
    async fn extract(&self, url: &str) -> Result<ScrapedContent> {
        let parsed = Url::parse(url)
            .map_err(|e| CompeteError::fetch(url, format!("invalid URL: {e}")))?;

        if (self.guard)(&parsed) {
            warn!(%url, "SSRF protection: blocked");
            return Err(CompeteError::fetch(url, "blocked by URL guard"));
        }

        let (final_url, html) = self.throttle.run(self.fetch(&parsed)).await?;
        let content = parse_page(&html, url, &final_url);

        debug!(
            title = %content.title,
            headings = content.headings.len(),
            paragraphs = content.paragraphs.len(),
            raw_chars = content.raw_text.chars().count(),
            "page extracted"
        );

        Ok(content)
    }
}
