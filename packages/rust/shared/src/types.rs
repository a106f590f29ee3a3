//! Core domain types for competitive analysis runs.
//!
//! Every type here crosses a wire boundary (LLM output, HTTP payloads, the
//! phase handoff), so field names serialize in camelCase.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scraped content
// ---------------------------------------------------------------------------

/// A hyperlink found on a scraped page, resolved to absolute form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub text: String,
    pub href: String,
}

/// Bounded structured text extracted from one web page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedContent {
    pub url: String,
    pub title: String,
    pub description: String,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
    pub links: Vec<PageLink>,
    /// Title, description, headings and paragraphs joined, capped in length.
    pub raw_text: String,
}

/// The slice of [`ScrapedContent`] handed back to the caller after Phase 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetContent {
    pub url: String,
    pub title: String,
    pub raw_text: String,
}

impl From<&ScrapedContent> for TargetContent {
    fn from(content: &ScrapedContent) -> Self {
        Self {
            url: content.url.clone(),
            title: content.title.clone(),
            raw_text: content.raw_text.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Business profile & competitors
// ---------------------------------------------------------------------------

/// Company identity and facts extracted from its own site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub company_name: String,
    pub industry: String,
    pub description: String,
    pub value_proposition: String,
    pub target_audience: String,
    pub key_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<Vec<String>>,
}

/// A candidate or confirmed rival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub name: String,
    /// Absolute http(s) URL.
    pub url: String,
    pub description: String,
    /// Model confidence (0–100); only comparable within one discovery batch.
    pub relevance_score: f64,
    pub reasoning: String,
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}

/// A competitor as proposed by the model, before URL checks and approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorCandidate {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl From<CompetitorCandidate> for Competitor {
    fn from(c: CompetitorCandidate) -> Self {
        Self {
            name: c.name,
            url: c.url,
            description: c.description,
            relevance_score: c.relevance_score,
            reasoning: c.reasoning,
            approved: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis artifacts
// ---------------------------------------------------------------------------

/// Deep analysis of one competitor's site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    pub company_name: String,
    pub url: String,
    pub overview: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub key_features: Vec<String>,
    pub pricing_model: String,
    pub target_market: String,
    pub differentiators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSegment {
    pub name: String,
    pub description: String,
    pub players: Vec<String>,
}

/// Synthesis over all competitor analyses plus the target profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub market_overview: String,
    pub market_segments: Vec<MarketSegment>,
    pub competitive_positioning: String,
    pub market_trends: Vec<String>,
    pub entry_barriers: Vec<String>,
}

/// Priority / severity scale. Declaration order sorts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub fn as_upper(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub title: String,
    pub description: String,
    pub priority: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub title: String,
    pub description: String,
    pub severity: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
}

/// Final strategic output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicRecommendations {
    pub summary: String,
    pub opportunities: Vec<Opportunity>,
    pub threats: Vec<Threat>,
    pub recommendations: Vec<Recommendation>,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One ranked web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    /// Rank-derived relevance in `(0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

/// How much output budget analysis completions get.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Quick,
    #[default]
    Normal,
    Deep,
}

impl Depth {
    /// Output-token budget for analysis-grade completions.
    pub fn max_output_tokens(&self) -> u32 {
        match self {
            Self::Quick => 2048,
            Self::Normal => 4096,
            Self::Deep => 8192,
        }
    }
}

/// Where Phase 1 gets its competitor candidates from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Model knowledge only.
    #[default]
    Inference,
    /// Live web search filtered by the model.
    Search,
}
