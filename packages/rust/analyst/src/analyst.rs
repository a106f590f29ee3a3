//! Structured model operations used by the pipeline.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use compete_shared::{
    BusinessProfile, Competitor, CompetitorAnalysis, CompetitorCandidate, MarketAnalysis, Result,
    ScrapedContent, SearchResult, StrategicRecommendations, Throttle,
};

use crate::discovery::{SelfMatch, screen_candidates};
use crate::json::decode;
use crate::prompts::{self, Prompt, PromptKind, list};

/// Default output budget for analysis-grade completions.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Output budget for search query generation.
const SEARCH_QUERY_TOKENS: u32 = 1024;

/// Output budget for the connectivity check.
const PING_TOKENS: u32 = 16;

/// Issues prompts through a [`CompletionProvider`](crate::CompletionProvider),
/// paced by the shared LLM throttle, and decodes the replies.
#[derive(Clone)]
pub struct Analyst {
    provider: Arc<dyn crate::CompletionProvider>,
    throttle: Throttle,
    max_tokens: u32,
}

impl Analyst {
    pub fn new(provider: Arc<dyn crate::CompletionProvider>, throttle: Throttle) -> Self {
        Self {
            provider,
            throttle,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the output budget used by analysis-grade operations.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// One raw completion, paced by the LLM throttle.
    pub async fn complete(&self, prompt: &Prompt, max_tokens: u32) -> Result<String> {
        self.throttle
            .run(self.provider.complete(prompt, max_tokens))
            .await
    }

    /// Complete `prompt` and decode the reply into `T`.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        prompt: &Prompt,
        max_tokens: u32,
    ) -> Result<T> {
        let text = self.complete(prompt, max_tokens).await?;
        decode(&text)
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract_business_profile(
        &self,
        url: &str,
        content: &ScrapedContent,
    ) -> Result<BusinessProfile> {
        let prompt = PromptKind::BusinessProfile.render(&[
            ("url", url.to_string()),
            ("content", content.raw_text.clone()),
        ]);
        let profile: BusinessProfile = self.complete_structured(&prompt, self.max_tokens).await?;
        info!(company = %profile.company_name, industry = %profile.industry, "business profile extracted");
        Ok(profile)
    }

    #[instrument(skip_all, fields(company = %profile.company_name))]
    pub async fn generate_search_queries(&self, profile: &BusinessProfile) -> Result<Vec<String>> {
        let prompt = PromptKind::SearchQueries.render(&profile_vars(profile));
        let queries: Vec<String> = self.complete_structured(&prompt, SEARCH_QUERY_TOKENS).await?;
        let queries: Vec<String> = queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        debug!(count = queries.len(), "search queries generated");
        Ok(queries)
    }

    /// Propose up to `count` competitors from model knowledge alone.
    #[instrument(skip_all, fields(company = %profile.company_name, count = count))]
    pub async fn infer_competitors(
        &self,
        profile: &BusinessProfile,
        count: usize,
        target: Option<&Url>,
    ) -> Result<Vec<Competitor>> {
        let mut vars = profile_vars(profile);
        vars.push(("maxCompetitors", count.to_string()));
        vars.push(("scoreGuide", prompts::score_guide()));
        let prompt = PromptKind::InferCompetitors.render(&vars);

        let candidates: Vec<CompetitorCandidate> =
            self.complete_structured(&prompt, self.max_tokens).await?;
        let proposed = candidates.len();
        let competitors = screen_candidates(
            candidates,
            &SelfMatch::new(&profile.company_name, target),
            count,
        );

        info!(proposed, kept = competitors.len(), "competitors inferred");
        Ok(competitors)
    }

    /// Pick up to `count` competitors out of live search results.
    #[instrument(skip_all, fields(company = %profile.company_name, results = results.len(), count = count))]
    pub async fn filter_competitors(
        &self,
        profile: &BusinessProfile,
        results: &[SearchResult],
        count: usize,
        target: Option<&Url>,
    ) -> Result<Vec<Competitor>> {
        let mut vars = profile_vars(profile);
        vars.push(("searchResults", format_search_results(results)));
        vars.push(("maxCompetitors", count.to_string()));
        vars.push(("scoreGuide", prompts::score_guide()));
        let prompt = PromptKind::FilterCompetitors.render(&vars);

        let candidates: Vec<CompetitorCandidate> =
            self.complete_structured(&prompt, self.max_tokens).await?;
        let proposed = candidates.len();
        let competitors = screen_candidates(
            candidates,
            &SelfMatch::new(&profile.company_name, target),
            count,
        );

        info!(proposed, kept = competitors.len(), "competitors filtered from search");
        Ok(competitors)
    }

    /// Analyse one competitor page. The returned analysis carries `url`.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn analyze_competitor(
        &self,
        url: &str,
        content: &ScrapedContent,
    ) -> Result<CompetitorAnalysis> {
        let prompt = PromptKind::CompetitorAnalysis.render(&[
            ("url", url.to_string()),
            ("content", content.raw_text.clone()),
        ]);
        let mut analysis: CompetitorAnalysis =
            self.complete_structured(&prompt, self.max_tokens).await?;
        analysis.url = url.to_string();
        Ok(analysis)
    }

    #[instrument(skip_all, fields(competitors = analyses.len()))]
    pub async fn generate_market_analysis(
        &self,
        profile: &BusinessProfile,
        analyses: &[CompetitorAnalysis],
    ) -> Result<MarketAnalysis> {
        let prompt = PromptKind::MarketAnalysis.render(&[
            ("targetProfile", prompts::json(profile)),
            ("competitorAnalyses", prompts::json(analyses)),
        ]);
        self.complete_structured(&prompt, self.max_tokens).await
    }

    #[instrument(skip_all, fields(competitors = analyses.len()))]
    pub async fn generate_strategic_recommendations(
        &self,
        profile: &BusinessProfile,
        analyses: &[CompetitorAnalysis],
        market: &MarketAnalysis,
    ) -> Result<StrategicRecommendations> {
        let prompt = PromptKind::StrategicRecommendations.render(&[
            ("targetProfile", prompts::json(profile)),
            ("competitorAnalyses", prompts::json(analyses)),
            ("marketAnalysis", prompts::json(market)),
        ]);
        self.complete_structured(&prompt, self.max_tokens).await
    }

    /// Send a trivial prompt and return the reply text.
    pub async fn check_connection(&self) -> Result<String> {
        let reply = self.complete(&PromptKind::Ping.render(&[]), PING_TOKENS).await?;
        Ok(reply.trim().to_string())
    }
}

/// Placeholder values describing the target company.
fn profile_vars(profile: &BusinessProfile) -> Vec<(&'static str, String)> {
    vec![
        ("companyName", profile.company_name.clone()),
        ("industry", profile.industry.clone()),
        ("description", profile.description.clone()),
        ("valueProposition", profile.value_proposition.clone()),
        ("targetAudience", profile.target_audience.clone()),
        ("keyFeatures", list(&profile.key_features)),
    ]
}

fn format_search_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   URL: {}\n   {}", i + 1, r.title, r.url, r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedProvider;
    use compete_shared::CompeteError;

    const PROFILE_JSON: &str = r#"```json
{
  "companyName": "Acme",
  "industry": "Project Management Software",
  "description": "Acme Boards helps teams plan work.",
  "valueProposition": "Fast planning",
  "targetAudience": "Product teams",
  "keyFeatures": ["Kanban boards", "Roadmaps"],
  "pricingModel": "Freemium"
}
```"#;

    const CANDIDATES_JSON: &str = r#"[
  {"name": "Acme Cloud", "url": "https://acmecloud.com", "description": "self", "relevanceScore": 95, "reasoning": "same"},
  {"name": "Beta", "url": "https://beta.io", "description": "boards", "relevanceScore": 92, "reasoning": "direct"},
  {"name": "Gamma", "url": "not a url", "description": "?", "relevanceScore": 80, "reasoning": "?"},
  {"name": "Delta", "url": "https://delta.dev", "description": "roadmaps", "relevanceScore": 70, "reasoning": "overlap"}
]"#;

    fn content(url: &str, text: &str) -> ScrapedContent {
        ScrapedContent {
            url: url.into(),
            title: "Title".into(),
            description: String::new(),
            headings: vec![],
            paragraphs: vec![],
            links: vec![],
            raw_text: text.into(),
        }
    }

    fn analyst(provider: ScriptedProvider) -> (Analyst, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let analyst = Analyst::new(provider.clone(), Throttle::unlimited("llm"));
        (analyst, provider)
    }

    fn profile() -> BusinessProfile {
        decode(PROFILE_JSON).unwrap()
    }

    #[tokio::test]
    async fn extracts_profile_with_filled_prompt() {
        let (analyst, provider) =
            analyst(ScriptedProvider::new().on(PromptKind::BusinessProfile, PROFILE_JSON));

        let profile = analyst
            .extract_business_profile("https://acme.com", &content("https://acme.com", "Acme Boards plans work"))
            .await
            .unwrap();

        assert_eq!(profile.company_name, "Acme");
        assert_eq!(profile.pricing_model.as_deref(), Some("Freemium"));
        assert!(profile.tech_stack.is_none());

        let prompt = &provider.prompts()[0];
        assert_eq!(prompt.kind, PromptKind::BusinessProfile);
        assert!(prompt.text.contains("Website URL: https://acme.com"));
        assert!(prompt.text.contains("Acme Boards plans work"));
        assert!(!prompt.text.contains("{{"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_parse_error() {
        let (analyst, _) = analyst(
            ScriptedProvider::new().on(PromptKind::BusinessProfile, "Sorry, I cannot help."),
        );
        let err = analyst
            .extract_business_profile("https://acme.com", &content("https://acme.com", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, CompeteError::Parse { .. }));
    }

    #[tokio::test]
    async fn inferred_competitors_are_screened_and_truncated() {
        let (analyst, provider) =
            analyst(ScriptedProvider::new().on(PromptKind::InferCompetitors, CANDIDATES_JSON));
        let target = Url::parse("https://acme.com").unwrap();

        let competitors = analyst
            .infer_competitors(&profile(), 1, Some(&target))
            .await
            .unwrap();

        assert_eq!(competitors.len(), 1);
        assert_eq!(competitors[0].name, "Beta");
        assert_eq!(competitors[0].relevance_score, 92.0);
        assert!(competitors[0].approved);

        let prompt = &provider.prompts()[0].text;
        assert!(prompt.contains("Key features: Kanban boards, Roadmaps"));
        assert!(prompt.contains("Return at most 1 competitors"));
        assert!(prompt.contains("Never return a score below 60"));
    }

    #[tokio::test]
    async fn filter_path_lists_search_results() {
        let (analyst, provider) =
            analyst(ScriptedProvider::new().on(PromptKind::FilterCompetitors, CANDIDATES_JSON));
        let results = vec![SearchResult {
            title: "Beta boards".into(),
            url: "https://beta.io".into(),
            content: "Kanban for teams".into(),
            score: Some(1.0),
        }];

        let competitors = analyst
            .filter_competitors(&profile(), &results, 5, None)
            .await
            .unwrap();

        let names: Vec<_> = competitors.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Beta", "Delta"]);
        assert!(
            provider.prompts()[0].text.contains("1. Beta boards\n   URL: https://beta.io\n   Kanban for teams")
        );
    }

    #[tokio::test]
    async fn search_queries_drop_blanks() {
        let (analyst, _) = analyst(
            ScriptedProvider::new().on(PromptKind::SearchQueries, r#"["kanban tools", "  ", "acme alternatives"]"#),
        );
        let queries = analyst.generate_search_queries(&profile()).await.unwrap();
        assert_eq!(queries, vec!["kanban tools", "acme alternatives"]);
    }

    #[tokio::test]
    async fn competitor_analysis_carries_requested_url() {
        let reply = r#"{"companyName": "Beta", "url": "https://wrong.example",
            "overview": "o", "strengths": ["s"], "weaknesses": [], "keyFeatures": ["k"],
            "pricingModel": "subscription", "targetMarket": "SMB", "differentiators": []}"#;
        let (analyst, _) =
            analyst(ScriptedProvider::new().on(PromptKind::CompetitorAnalysis, reply));

        let analysis = analyst
            .analyze_competitor("https://beta.io", &content("https://beta.io", "Beta"))
            .await
            .unwrap();
        assert_eq!(analysis.url, "https://beta.io");
        assert_eq!(analysis.company_name, "Beta");
    }

    #[tokio::test]
    async fn recommendations_prompt_embeds_market_analysis() {
        let recs = r#"{"summary": "s", "opportunities": [], "threats": [], "recommendations": []}"#;
        let (analyst, provider) =
            analyst(ScriptedProvider::new().on(PromptKind::StrategicRecommendations, recs));
        let market = MarketAnalysis {
            market_overview: "Crowded kanban market".into(),
            market_segments: vec![],
            competitive_positioning: "p".into(),
            market_trends: vec![],
            entry_barriers: vec![],
        };

        analyst
            .generate_strategic_recommendations(&profile(), &[], &market)
            .await
            .unwrap();
        assert!(provider.prompts()[0].text.contains("Crowded kanban market"));
    }

    #[tokio::test]
    async fn connection_check_trims_reply() {
        let (analyst, provider) = analyst(ScriptedProvider::new().on(PromptKind::Ping, " OK\n"));
        assert_eq!(analyst.check_connection().await.unwrap(), "OK");
        assert_eq!(provider.prompts()[0].text, prompts::PING);
        assert_eq!(analyst.model(), "scripted");
    }
}
