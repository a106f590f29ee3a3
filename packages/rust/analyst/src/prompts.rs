//! Prompt templates and `{{name}}` placeholder filling.
//!
//! A rendered [`Prompt`] carries its [`PromptKind`] beside the text, so
//! providers and logs can tell prompts apart without the kind ever reaching
//! the model.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder regex"));

/// The distinct prompts the analyst sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    BusinessProfile,
    SearchQueries,
    FilterCompetitors,
    InferCompetitors,
    CompetitorAnalysis,
    MarketAnalysis,
    StrategicRecommendations,
    /// Connectivity check.
    Ping,
}

impl PromptKind {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BusinessProfile => "business-profile",
            Self::SearchQueries => "search-queries",
            Self::FilterCompetitors => "filter-competitors",
            Self::InferCompetitors => "infer-competitors",
            Self::CompetitorAnalysis => "competitor-analysis",
            Self::MarketAnalysis => "market-analysis",
            Self::StrategicRecommendations => "strategic-recommendations",
            Self::Ping => "ping",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::BusinessProfile => BUSINESS_PROFILE,
            Self::SearchQueries => SEARCH_QUERIES,
            Self::FilterCompetitors => FILTER_COMPETITORS,
            Self::InferCompetitors => INFER_COMPETITORS,
            Self::CompetitorAnalysis => COMPETITOR_ANALYSIS,
            Self::MarketAnalysis => MARKET_ANALYSIS,
            Self::StrategicRecommendations => STRATEGIC_RECOMMENDATIONS,
            Self::Ping => PING,
        }
    }

    /// Fill this kind's template with `vars`.
    pub fn render(self, vars: &[(&str, String)]) -> Prompt {
        Prompt {
            kind: self,
            text: fill(self.template(), vars),
        }
    }
}

/// A rendered prompt. Only `text` is sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
}

/// Replace every `{{key}}` in `template` with its value from `vars`.
///
/// Unknown placeholders are left as they are.
pub fn fill(template: &str, vars: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Render a list value: items joined with ", ".
pub fn list(items: &[String]) -> String {
    items.join(", ")
}

/// Render an object value as pretty JSON.
pub fn json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// Prompt used by the connectivity check.
pub const PING: &str = "Reply with the single word OK.";

const SCORE_GUIDE: &str = "\
Relevance score guide:
- 85-100: direct competitor. Same market, similar features, same audience.
- 70-84: strong overlap. Competes for the same customers through a large share of features or audience.
- 60-69: partial overlap. A credible alternative for some use cases.
- Below 60: leave it out entirely. Never return a score below 60.";

const BUSINESS_PROFILE: &str = "You are building a business profile that will anchor a competitive analysis.

Website URL: {{url}}
Website content:
{{content}}

Respond with one JSON object of this shape:
{
  \"companyName\": \"official company or product name\",
  \"industry\": \"primary industry, e.g. 'Project Management Software'\",
  \"description\": \"two or three sentences on what the company does\",
  \"valueProposition\": \"the main reason customers pick them\",
  \"targetAudience\": \"who the product is for\",
  \"keyFeatures\": [\"5 to 8 concrete product capabilities\"],
  \"pricingModel\": \"Free, Freemium, Subscription, Usage-based, Enterprise/Contact Sales, or Not publicly disclosed\",
  \"techStack\": [\"technologies named on the site\"]
}

Rules:
- Describe capabilities, not marketing slogans.
- Use \"Not publicly disclosed\" when the site shows no pricing.
- Leave out techStack entirely unless technologies are named explicitly.

Return only the JSON object.";

const SEARCH_QUERIES: &str = "Write web search queries that would surface direct competitors of this company.

Company: {{companyName}}
Industry: {{industry}}
Description: {{description}}
Value proposition: {{valueProposition}}
Target audience: {{targetAudience}}
Key features: {{keyFeatures}}

Write exactly 5 queries, one for each angle:
1. industry plus product category
2. \"alternatives to\" or \"competitors of\" phrasing
3. a distinctive feature
4. the target audience plus the kind of solution
5. the problem the product solves

Return only a JSON array of 5 strings.";

const FILTER_COMPETITORS: &str = "Pick the genuine competitors of the target company from these web search results.

Target company:
- Name: {{companyName}}
- Industry: {{industry}}
- Description: {{description}}
- Value proposition: {{valueProposition}}

Search results:
{{searchResults}}

Return at most {{maxCompetitors}} competitors. For each, give name, url (main domain only, like https://example.com), description, relevanceScore and reasoning.

{{scoreGuide}}

Exclude the target company itself. Exclude reference, social, news and review sites such as Wikipedia, LinkedIn, G2 or Capterra.

Return only a JSON array:
[
  {\"name\": \"...\", \"url\": \"https://...\", \"description\": \"...\", \"relevanceScore\": 85, \"reasoning\": \"...\"}
]";

const INFER_COMPETITORS: &str = "From your own knowledge, name the most likely direct competitors of this company. Prefer well-established companies that are probably still operating.

Target company:
- Name: {{companyName}}
- Industry: {{industry}}
- Description: {{description}}
- Value proposition: {{valueProposition}}
- Target audience: {{targetAudience}}
- Key features: {{keyFeatures}}

Return at most {{maxCompetitors}} competitors that sell to similar customers in the same market and would be weighed as alternatives. For each, give:
- name
- url: the real main website, domain only (https://asana.com, not https://asana.com/product)
- description: one or two sentences
- relevanceScore
- reasoning: one or two sentences

{{scoreGuide}}

Only include real companies with working websites. Never include the target company itself.

Return only a JSON array:
[
  {\"name\": \"...\", \"url\": \"https://...\", \"description\": \"...\", \"relevanceScore\": 92, \"reasoning\": \"...\"}
]";

const COMPETITOR_ANALYSIS: &str = "Analyse this competitor's website for a competitive analysis report.

Competitor URL: {{url}}
Website content:
{{content}}

Respond with one JSON object:
{
  \"companyName\": \"company name\",
  \"url\": \"{{url}}\",
  \"overview\": \"two or three sentence overview\",
  \"strengths\": [\"...\"],
  \"weaknesses\": [\"...\"],
  \"keyFeatures\": [\"...\"],
  \"pricingModel\": \"free, freemium, subscription, enterprise, ...\",
  \"targetMarket\": \"who they sell to\",
  \"differentiators\": [\"...\"]
}

Stay grounded in the content. Where something is missing, infer cautiously and say so.

Return only the JSON object.";

const MARKET_ANALYSIS: &str = "Synthesize a market analysis from the target company profile and the competitor analyses below.

Target company:
{{targetProfile}}

Competitors:
{{competitorAnalyses}}

Respond with one JSON object:
{
  \"marketOverview\": \"two or three paragraphs on the landscape\",
  \"marketSegments\": [
    {\"name\": \"segment\", \"description\": \"what it covers\", \"players\": [\"company\"]}
  ],
  \"competitivePositioning\": \"where the target stands relative to the competitors\",
  \"marketTrends\": [\"...\"],
  \"entryBarriers\": [\"...\"]
}

Look for patterns across competitors rather than restating each one.

Return only the JSON object.";

const STRATEGIC_RECOMMENDATIONS: &str = "Give the target company strategic recommendations based on this competitive analysis.

Target company profile:
{{targetProfile}}

Competitor analyses:
{{competitorAnalyses}}

Market analysis:
{{marketAnalysis}}

Respond with one JSON object:
{
  \"summary\": \"executive summary of the key findings, two or three paragraphs\",
  \"opportunities\": [
    {\"title\": \"...\", \"description\": \"...\", \"priority\": \"high|medium|low\"}
  ],
  \"threats\": [
    {\"title\": \"...\", \"description\": \"...\", \"severity\": \"high|medium|low\"}
  ],
  \"recommendations\": [
    {\"title\": \"...\", \"description\": \"...\", \"actionItems\": [\"...\"]}
  ]
}

Be specific and actionable. Order recommendations by expected impact.

Return only the JSON object.";

/// Score guide shared by both discovery prompts.
pub fn score_guide() -> String {
    SCORE_GUIDE.to_string()
}
