//! The two-phase competitive analysis pipeline.
//!
//! Phase 1 (`start`): target URL → scrape → business profile → competitor
//! discovery. Phase 2 (`continue_analysis`): approved competitors → scrape →
//! per-competitor analysis → market analysis → recommendations → report.
//! `run_full` chains both with every discovered competitor approved.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::future::join_all;
use tracing::{Span, field, info, instrument, warn};
use url::Url;

use compete_analyst::Analyst;
use compete_extractor::PageSource;
use compete_search::SearchProvider;
use compete_shared::{
    BusinessProfile, CompeteError, Competitor, CompetitorAnalysis, DiscoveryMode, Result,
    TargetContent, normalize_url,
};

use crate::events::{CompetitorSummary, EventSink, PipelineEvent, Status, Step};
use crate::replace::{REPLACEMENT_HEADROOM, exclude_named};
use crate::workflow::{AnalysisOutcome, DiscoveryHandoff, Run, WorkflowState};

pub const NO_COMPETITORS: &str = "No competitors found. Try a different URL.";
pub const NO_ANALYSES: &str = "Could not analyze any competitors.";
pub const NO_REPLACEMENTS: &str = "No replacement competitors found.";

/// Orchestrates the collaborators. Holds no per-run state, so one instance
/// serves every request.
pub struct Pipeline {
    pages: Arc<dyn PageSource>,
    analyst: Analyst,
    search: Option<Arc<dyn SearchProvider>>,
    results_per_query: usize,
}

impl Pipeline {
    /// A pipeline that discovers competitors by model inference.
    pub fn new(pages: Arc<dyn PageSource>, analyst: Analyst) -> Self {
        Self {
            pages,
            analyst,
            search: None,
            results_per_query: 0,
        }
    }

    /// Discover competitors from web search results instead.
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>, results_per_query: usize) -> Self {
        self.search = Some(search);
        self.results_per_query = results_per_query;
        self
    }

    pub fn discovery_mode(&self) -> DiscoveryMode {
        if self.search.is_some() {
            DiscoveryMode::Search
        } else {
            DiscoveryMode::Inference
        }
    }

    pub fn analyst(&self) -> &Analyst {
        &self.analyst
    }

    // -----------------------------------------------------------------------
    // Public phases
    // -----------------------------------------------------------------------

    /// Phase 1. Fails with `EmptyResult` when no competitor survives discovery.
    #[instrument(skip_all, fields(run_id = field::Empty, url = %target, count = count))]
    pub async fn start(
        &self,
        target: &Url,
        count: usize,
        sink: &dyn EventSink,
    ) -> Result<DiscoveryHandoff> {
        let mut run = begin(WorkflowState::Idle);
        let result = self.discover(&mut run, target, count, sink).await;
        finish(&mut run, &result);
        result
    }

    /// Find up to `count` fresh competitors whose names overlap none of
    /// `exclude_names`.
    #[instrument(skip_all, fields(company = %profile.company_name, count = count, excluded = exclude_names.len()))]
    pub async fn replace(
        &self,
        profile: &BusinessProfile,
        exclude_names: &[String],
        count: usize,
        target: Option<&Url>,
    ) -> Result<Vec<Competitor>> {
        let ask = count + exclude_names.len() + REPLACEMENT_HEADROOM;
        let candidates = self.analyst.infer_competitors(profile, ask, target).await?;
        let proposed = candidates.len();

        let fresh = exclude_named(candidates, exclude_names, count);
        info!(proposed, kept = fresh.len(), "replacement candidates filtered");

        if fresh.is_empty() {
            return Err(CompeteError::empty(NO_REPLACEMENTS));
        }
        Ok(fresh)
    }

    /// Phase 2 over the caller's approved competitors.
    #[instrument(skip_all, fields(run_id = field::Empty, url = %target_url, competitors = competitors.len()))]
    pub async fn continue_analysis(
        &self,
        target_url: &str,
        profile: &BusinessProfile,
        competitors: &[Competitor],
        sink: &dyn EventSink,
    ) -> Result<AnalysisOutcome> {
        let mut run = begin(WorkflowState::Validating);
        let result = self
            .analyze(&mut run, target_url, profile, competitors, sink)
            .await;
        finish(&mut run, &result);
        result
    }

    /// Both phases back to back, analysing every discovered competitor.
    #[instrument(skip_all, fields(run_id = field::Empty, url = %target, count = count))]
    pub async fn run_full(
        &self,
        target: &Url,
        count: usize,
        sink: &dyn EventSink,
    ) -> Result<AnalysisOutcome> {
        let started = Instant::now();
        let mut run = begin(WorkflowState::Idle);

        let result = match self.discover(&mut run, target, count, sink).await {
            Ok(handoff) => {
                self.analyze(
                    &mut run,
                    target.as_str(),
                    &handoff.target_profile,
                    &handoff.competitors,
                    sink,
                )
                .await
            }
            Err(e) => Err(e),
        };

        finish(&mut run, &result);
        if result.is_ok() {
            info!(elapsed_ms = started.elapsed().as_millis(), "full analysis complete");
        }
        result
    }

    /// [`run_full`](Self::run_full), then exactly one terminal event.
    pub async fn stream_full(
        &self,
        target: &Url,
        count: usize,
        sink: &dyn EventSink,
    ) -> Result<AnalysisOutcome> {
        let result = self.run_full(target, count, sink).await;
        emit_terminal(sink, &result);
        result
    }

    /// [`continue_analysis`](Self::continue_analysis), then exactly one
    /// terminal event.
    pub async fn stream_continue(
        &self,
        target_url: &str,
        profile: &BusinessProfile,
        competitors: &[Competitor],
        sink: &dyn EventSink,
    ) -> Result<AnalysisOutcome> {
        let result = self
            .continue_analysis(target_url, profile, competitors, sink)
            .await;
        emit_terminal(sink, &result);
        result
    }

    // -----------------------------------------------------------------------
    // Phase bodies
    // -----------------------------------------------------------------------

    async fn discover(
        &self,
        run: &mut Run,
        target: &Url,
        count: usize,
        sink: &dyn EventSink,
    ) -> Result<DiscoveryHandoff> {
        run.advance(WorkflowState::Identifying);

        progress(sink, Step::Scraping, Status::InProgress, "Analyzing target website");
        let content = self.pages.extract(target.as_str()).await?;
        progress(sink, Step::Scraping, Status::Complete, format!("Scraped: {}", content.title));

        progress(sink, Step::Profile, Status::InProgress, "Extracting business profile");
        let profile = self
            .analyst
            .extract_business_profile(target.as_str(), &content)
            .await?;
        progress(
            sink,
            Step::Profile,
            Status::Complete,
            format!("Identified: {}", profile.company_name),
        );
        sink.emit(PipelineEvent::Profile {
            company_name: profile.company_name.clone(),
            industry: profile.industry.clone(),
        });

        progress(sink, Step::Identifying, Status::InProgress, "Identifying competitors");
        let competitors = self.discover_competitors(&profile, count, target).await?;
        progress(
            sink,
            Step::Identifying,
            Status::Complete,
            format!("Found {} competitors", competitors.len()),
        );

        if competitors.is_empty() {
            return Err(CompeteError::empty(NO_COMPETITORS));
        }
        sink.emit(PipelineEvent::Competitors(
            competitors.iter().map(CompetitorSummary::from).collect(),
        ));

        run.advance(WorkflowState::Validating);
        Ok(DiscoveryHandoff {
            target_profile: profile,
            target_content: TargetContent::from(&content),
            competitors,
        })
    }

    async fn discover_competitors(
        &self,
        profile: &BusinessProfile,
        count: usize,
        target: &Url,
    ) -> Result<Vec<Competitor>> {
        if let Some(search) = &self.search {
            let queries = self.analyst.generate_search_queries(profile).await?;
            let results = search.search_many(&queries, self.results_per_query).await;
            if !results.is_empty() {
                return self
                    .analyst
                    .filter_competitors(profile, &results, count, Some(target))
                    .await;
            }
            warn!(queries = queries.len(), "search returned nothing, falling back to inference");
        }

        self.analyst
            .infer_competitors(profile, count, Some(target))
            .await
    }

    async fn analyze(
        &self,
        run: &mut Run,
        target_url: &str,
        profile: &BusinessProfile,
        competitors: &[Competitor],
        sink: &dyn EventSink,
    ) -> Result<AnalysisOutcome> {
        run.advance(WorkflowState::Analyzing);

        let approved = unique_approved(competitors);
        let urls: Vec<String> = approved.iter().map(|c| c.url.clone()).collect();

        progress(sink, Step::ScrapingCompetitors, Status::InProgress, "Scraping competitor websites");
        let pages = self.pages.extract_many(&urls).await;
        progress(
            sink,
            Step::ScrapingCompetitors,
            Status::Complete,
            format!("Scraped {} websites", pages.len()),
        );

        progress(sink, Step::Analyzing, Status::InProgress, "Analyzing competitors");
        let total = approved.len();
        let done = AtomicUsize::new(0);
        let tasks = approved
            .iter()
            .filter_map(|c| pages.get(&c.url).map(|content| (c, content)))
            .map(|(competitor, content)| {
                let done = &done;
                async move {
                    match self.analyst.analyze_competitor(&competitor.url, content).await {
                        Ok(analysis) => {
                            let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                            progress(
                                sink,
                                Step::Analyzing,
                                Status::InProgress,
                                format!("Analyzed {n}/{total}"),
                            );
                            Some(analysis)
                        }
                        Err(e) => {
                            warn!(url = %competitor.url, error = %e, "competitor analysis failed, dropping");
                            None
                        }
                    }
                }
            });
        let analyses: Vec<CompetitorAnalysis> =
            join_all(tasks).await.into_iter().flatten().collect();
        progress(
            sink,
            Step::Analyzing,
            Status::Complete,
            format!("Analyzed {} competitors", analyses.len()),
        );

        if analyses.is_empty() {
            return Err(CompeteError::empty(NO_ANALYSES));
        }

        progress(sink, Step::Market, Status::InProgress, "Generating market analysis");
        let market = self
            .analyst
            .generate_market_analysis(profile, &analyses)
            .await?;
        progress(sink, Step::Market, Status::Complete, "Market analysis complete");

        progress(sink, Step::Recommendations, Status::InProgress, "Generating recommendations");
        let recommendations = self
            .analyst
            .generate_strategic_recommendations(profile, &analyses, &market)
            .await?;
        progress(sink, Step::Recommendations, Status::Complete, "Recommendations complete");

        progress(sink, Step::Report, Status::InProgress, "Creating report");
        let report = compete_report::render(target_url, profile, &analyses, &market, &recommendations);
        progress(sink, Step::Report, Status::Complete, "Report complete");

        run.advance(WorkflowState::Complete);
        info!(
            analyses = analyses.len(),
            requested = total,
            report_chars = report.len(),
            "analysis phase complete"
        );

        Ok(AnalysisOutcome {
            report,
            company_name: profile.company_name.clone(),
            analyses,
            market,
            recommendations,
        })
    }
}

/// Approved competitors, first occurrence per normalized URL.
fn unique_approved(competitors: &[Competitor]) -> Vec<&Competitor> {
    let mut seen = std::collections::HashSet::new();
    competitors
        .iter()
        .filter(|c| c.approved)
        .filter(|c| seen.insert(normalize_url(&c.url)))
        .collect()
}

fn begin(state: WorkflowState) -> Run {
    let run = Run::resume(state);
    Span::current().record("run_id", field::display(run.id));
    run
}

fn finish<T>(run: &mut Run, result: &Result<T>) {
    if let Err(e) = result {
        run.fail(e);
    }
}

fn progress(sink: &dyn EventSink, step: Step, status: Status, message: impl Into<String>) {
    sink.emit(PipelineEvent::progress(step, status, message));
}

fn emit_terminal(sink: &dyn EventSink, result: &Result<AnalysisOutcome>) {
    let event = match result {
        Ok(outcome) => PipelineEvent::Complete {
            report: outcome.report.clone(),
            company_name: outcome.company_name.clone(),
        },
        Err(e) => PipelineEvent::Error {
            message: e.user_message(),
        },
    };
    sink.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use compete_analyst::{PromptKind, ScriptedProvider};
    use compete_extractor::StaticPages;
    use compete_search::StaticSearch;
    use compete_shared::{SearchResult, Throttle};

    use crate::events::RecordingSink;

    const ACME_HTML: &str = include_str!("../../../../fixtures/html/acme-landing.html");
    const TARGET: &str = "https://acme.com/";

    const PROFILE: &str = r#"{
        "companyName": "Acme Boards",
        "industry": "Project Management Software",
        "description": "Acme Boards is a project management tool for fast-moving teams.",
        "valueProposition": "Plan, track, and ship without status meetings",
        "targetAudience": "Small product teams",
        "keyFeatures": ["Kanban boards", "Timelines", "Automations"],
        "pricingModel": "Freemium"
    }"#;

    const THREE_COMPETITORS: &str = r#"```json
[
  {"name": "Acme Boards Enterprise", "url": "https://acme.com/enterprise", "description": "self", "relevanceScore": 99, "reasoning": "same company"},
  {"name": "Beta", "url": "https://beta.io", "description": "Boards for teams", "relevanceScore": 92, "reasoning": "direct"},
  {"name": "Delta", "url": "https://delta.dev", "description": "Roadmaps", "relevanceScore": 78, "reasoning": "overlap"},
  {"name": "Gamma", "url": "https://gamma.app", "description": "Docs and tasks", "relevanceScore": 65, "reasoning": "partial"}
]
```"#;

    const MARKET: &str = r#"{
        "marketOverview": "Work management is crowded.",
        "marketSegments": [{"name": "SMB", "description": "Small teams", "players": ["Beta"]}],
        "competitivePositioning": "Acme is the simple option.",
        "marketTrends": ["AI planning"],
        "entryBarriers": ["Integrations"]
    }"#;

    const RECS: &str = r#"{
        "summary": "Acme should lean into simplicity.",
        "opportunities": [{"title": "Agencies", "description": "Underserved", "priority": "high"}],
        "threats": [{"title": "Suites", "description": "Bundling", "severity": "high"}],
        "recommendations": [{"title": "Agency tier", "description": "Ship it", "actionItems": ["Interview agencies"]}]
    }"#;

    fn analysis_reply(name: &str) -> String {
        format!(
            r#"{{"companyName": "{name}", "url": "", "overview": "{name} overview",
                "strengths": ["{name} strength"], "weaknesses": ["{name} weakness"],
                "keyFeatures": ["{name} feature"], "pricingModel": "Subscription",
                "targetMarket": "Teams", "differentiators": ["{name} edge"]}}"#
        )
    }

    fn competitor_page(name: &str) -> String {
        format!(
            "<html><head><title>{name}</title></head><body><main>\
             <p>{name} helps teams organise their work with boards and timelines.</p>\
             </main></body></html>"
        )
    }

    fn needle(url: &str) -> String {
        format!("Competitor URL: {url}\n")
    }

    /// Provider scripted for the happy path of the acme scenario.
    fn acme_provider() -> ScriptedProvider {
        ScriptedProvider::new()
            .on(PromptKind::BusinessProfile, PROFILE)
            .on(PromptKind::InferCompetitors, THREE_COMPETITORS)
            .on(PromptKind::MarketAnalysis, MARKET)
            .on(PromptKind::StrategicRecommendations, RECS)
            .on_text(needle("https://beta.io"), analysis_reply("Beta"))
            .on_text(needle("https://delta.dev"), analysis_reply("Delta"))
            .on_text(needle("https://gamma.app"), analysis_reply("Gamma"))
    }

    fn acme_pages() -> StaticPages {
        StaticPages::new()
            .with_html(TARGET, ACME_HTML)
            .with_html("https://beta.io", &competitor_page("Beta"))
            .with_html("https://delta.dev", &competitor_page("Delta"))
            .with_html("https://gamma.app", &competitor_page("Gamma"))
    }

    fn pipeline(provider: ScriptedProvider, pages: StaticPages) -> (Pipeline, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let analyst = Analyst::new(provider.clone(), Throttle::unlimited("llm"));
        (Pipeline::new(Arc::new(pages), analyst), provider)
    }

    fn target() -> Url {
        Url::parse(TARGET).unwrap()
    }

    fn profile() -> BusinessProfile {
        serde_json::from_str(PROFILE).unwrap()
    }

    fn competitor(name: &str, url: &str, approved: bool) -> Competitor {
        Competitor {
            name: name.into(),
            url: url.into(),
            description: String::new(),
            relevance_score: 80.0,
            reasoning: String::new(),
            approved,
        }
    }

    fn analysis_prompts(provider: &ScriptedProvider) -> usize {
        provider
            .prompts()
            .iter()
            .filter(|p| p.kind == PromptKind::CompetitorAnalysis)
            .count()
    }

    #[tokio::test]
    async fn acme_end_to_end() {
        let (pipeline, provider) = pipeline(acme_provider(), acme_pages());
        let sink = RecordingSink::new();

        let handoff = pipeline.start(&target(), 3, &sink).await.unwrap();

        let scores: Vec<f64> = handoff.competitors.iter().map(|c| c.relevance_score).collect();
        assert_eq!(scores, [92.0, 78.0, 65.0]);
        assert!(handoff.competitors.iter().all(|c| c.approved));
        assert!(
            handoff
                .competitors
                .iter()
                .all(|c| Url::parse(&c.url).is_ok_and(|u| u.scheme() == "https"))
        );
        assert_eq!(handoff.target_profile.company_name, "Acme Boards");
        assert_eq!(handoff.target_content.title, "Acme Boards | Plan work your team loves");
        assert!(handoff.target_content.raw_text.contains("Kanban boards, timelines"));

        // The profile prompt saw the scraped page, minus the chrome.
        let profile_prompt = &provider.prompts()[0].text;
        assert!(profile_prompt.contains("flat monthly price per seat"));
        assert!(!profile_prompt.contains("trackingPixel"));

        let outcome = pipeline
            .continue_analysis(TARGET, &handoff.target_profile, &handoff.competitors, &sink)
            .await
            .unwrap();

        assert_eq!(outcome.analyses.len(), 3);
        assert_eq!(outcome.analyses[0].url, "https://beta.io");
        assert_eq!(outcome.market.market_overview, "Work management is crowded.");
        assert_eq!(outcome.recommendations.opportunities.len(), 1);
        assert_eq!(outcome.company_name, "Acme Boards");
        assert!(!outcome.report.is_empty());
        assert!(outcome.report.to_lowercase().contains("acme"));
        assert!(outcome.report.contains("Gamma overview"));
    }

    #[tokio::test]
    async fn self_references_are_never_returned() {
        let (pipeline, _) = pipeline(acme_provider(), acme_pages());

        let handoff = pipeline.start(&target(), 10, &RecordingSink::new()).await.unwrap();

        assert_eq!(handoff.competitors.len(), 3);
        assert!(handoff.competitors.iter().all(|c| !c.url.contains("acme.com")));
    }

    #[tokio::test]
    async fn zero_competitors_fails_phase_one() {
        let provider = ScriptedProvider::new()
            .on(PromptKind::BusinessProfile, PROFILE)
            .on(PromptKind::InferCompetitors, "[]");
        let (pipeline, _) = pipeline(provider, acme_pages());
        let sink = RecordingSink::new();

        let err = pipeline.start(&target(), 3, &sink).await.unwrap_err();

        assert!(matches!(err, CompeteError::EmptyResult { .. }));
        assert_eq!(err.user_message(), NO_COMPETITORS);
        assert!(!sink.events().iter().any(|e| e.name() == "competitors"));
    }

    #[tokio::test]
    async fn unreachable_target_is_a_fetch_error() {
        let (pipeline, _) = pipeline(acme_provider(), StaticPages::new());
        let err = pipeline
            .start(&target(), 3, &RecordingSink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompeteError::Fetch { .. }));
    }

    #[tokio::test]
    async fn three_of_five_failures_still_complete() {
        let provider = ScriptedProvider::new()
            .on(PromptKind::MarketAnalysis, MARKET)
            .on(PromptKind::StrategicRecommendations, RECS)
            .on_text(needle("https://one.com"), analysis_reply("One"))
            .on_text(needle("https://two.com"), analysis_reply("Two"))
            .on_text(needle("https://garbled.com"), "I am not sure about this one.")
            .fail_on_text(needle("https://overloaded.com"), "529 overloaded");
        let pages = StaticPages::new()
            .with_html("https://one.com", &competitor_page("One"))
            .with_html("https://two.com", &competitor_page("Two"))
            .with_html("https://garbled.com", &competitor_page("Garbled"))
            .with_html("https://overloaded.com", &competitor_page("Overloaded"));
        let (pipeline, provider) = pipeline(provider, pages);

        let competitors = vec![
            competitor("One", "https://one.com", true),
            competitor("Offline", "https://offline.com", true),
            competitor("Garbled", "https://garbled.com", true),
            competitor("Two", "https://two.com", true),
            competitor("Overloaded", "https://overloaded.com", true),
        ];
        let outcome = pipeline
            .continue_analysis(TARGET, &profile(), &competitors, &RecordingSink::new())
            .await
            .unwrap();

        let names: Vec<_> = outcome.analyses.iter().map(|a| a.company_name.as_str()).collect();
        assert_eq!(names, ["One", "Two"]);
        assert!(outcome.report.contains("One overview"));

        // Market and recommendations ran over the survivors.
        let prompts = provider.prompts();
        assert!(prompts.iter().any(|p| p.kind == PromptKind::MarketAnalysis));
        let recs_prompt = prompts
            .iter()
            .find(|p| p.kind == PromptKind::StrategicRecommendations)
            .unwrap();
        assert!(recs_prompt.text.contains("Work management is crowded."));
    }

    #[tokio::test]
    async fn all_analyses_failing_is_empty_result() {
        let (pipeline, _) = pipeline(ScriptedProvider::new(), acme_pages());
        let err = pipeline
            .continue_analysis(
                TARGET,
                &profile(),
                &[competitor("Beta", "https://beta.io", true)],
                &RecordingSink::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), NO_ANALYSES);
    }

    #[tokio::test]
    async fn only_approved_unique_competitors_are_analyzed() {
        let (pipeline, provider) = pipeline(acme_provider(), acme_pages());
        let competitors = vec![
            competitor("Beta", "https://beta.io", true),
            competitor("Beta (duplicate)", "https://BETA.io/", true),
            competitor("Delta", "https://delta.dev", false),
        ];

        let outcome = pipeline
            .continue_analysis(TARGET, &profile(), &competitors, &RecordingSink::new())
            .await
            .unwrap();

        assert_eq!(outcome.analyses.len(), 1);
        assert_eq!(analysis_prompts(&provider), 1);
        assert!(!provider.prompts().iter().any(|p| p.text.contains(&needle("https://delta.dev"))));
    }

    #[tokio::test]
    async fn stream_full_ends_with_one_complete_event() {
        let (pipeline, _) = pipeline(acme_provider(), acme_pages());
        let sink = RecordingSink::new();

        pipeline.stream_full(&target(), 3, &sink).await.unwrap();

        let events = sink.events();
        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(events.last(), Some(PipelineEvent::Complete { .. })));

        let names: Vec<_> = events.iter().map(|e| e.name()).collect();
        let profile_at = names.iter().position(|n| *n == "profile").unwrap();
        let competitors_at = names.iter().position(|n| *n == "competitors").unwrap();
        assert!(profile_at < competitors_at);

        assert!(events.contains(&PipelineEvent::progress(
            Step::Analyzing,
            Status::Complete,
            "Analyzed 3 competitors"
        )));
        assert!(events.contains(&PipelineEvent::progress(
            Step::Analyzing,
            Status::InProgress,
            "Analyzed 3/3"
        )));
        assert!(events.contains(&PipelineEvent::progress(
            Step::Report,
            Status::Complete,
            "Report complete"
        )));
    }

    #[tokio::test]
    async fn stream_failure_ends_with_one_error_event() {
        let provider = ScriptedProvider::new().on(PromptKind::BusinessProfile, "no json here");
        let (pipeline, _) = pipeline(provider, acme_pages());
        let sink = RecordingSink::new();

        assert!(pipeline.stream_full(&target(), 3, &sink).await.is_err());

        let events = sink.events();
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        match events.last() {
            Some(PipelineEvent::Error { message }) => assert!(message.contains("parse error")),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_continue_reports_empty_analyses_as_error() {
        let (pipeline, _) = pipeline(ScriptedProvider::new(), StaticPages::new());
        let sink = RecordingSink::new();

        let _ = pipeline
            .stream_continue(
                TARGET,
                &profile(),
                &[competitor("Beta", "https://beta.io", true)],
                &sink,
            )
            .await;

        assert_eq!(
            sink.events().last(),
            Some(&PipelineEvent::Error {
                message: NO_ANALYSES.to_string()
            })
        );
    }

    #[tokio::test]
    async fn replace_excludes_named_competitors() {
        let candidates = r#"[
            {"name": "Beta", "url": "https://beta.io", "relevanceScore": 92},
            {"name": "Delta Labs", "url": "https://delta.dev", "relevanceScore": 85},
            {"name": "Epsilon", "url": "https://epsilon.so", "relevanceScore": 80},
            {"name": "Zeta", "url": "https://zeta.co", "relevanceScore": 74},
            {"name": "Eta", "url": "https://eta.io", "relevanceScore": 66}
        ]"#;
        let provider = ScriptedProvider::new().on(PromptKind::InferCompetitors, candidates);
        let (pipeline, provider) = pipeline(provider, StaticPages::new());

        let excluded = vec!["beta".to_string(), "Delta".to_string()];
        let fresh = pipeline.replace(&profile(), &excluded, 2, None).await.unwrap();

        let names: Vec<_> = fresh.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Epsilon", "Zeta"]);
        assert!(fresh.iter().all(|c| c.approved));
        assert!(provider.prompts()[0].text.contains("Return at most 7 competitors"));
    }

    #[tokio::test]
    async fn replace_with_nothing_left_is_empty_result() {
        let provider = ScriptedProvider::new().on(
            PromptKind::InferCompetitors,
            r#"[{"name": "Beta", "url": "https://beta.io", "relevanceScore": 92}]"#,
        );
        let (pipeline, _) = pipeline(provider, StaticPages::new());

        let err = pipeline
            .replace(&profile(), &["Beta".to_string()], 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CompeteError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn replace_drops_target_domain_when_known() {
        let provider = ScriptedProvider::new().on(
            PromptKind::InferCompetitors,
            r#"[{"name": "Boards Co", "url": "https://app.acme.com", "relevanceScore": 92},
                {"name": "Beta", "url": "https://beta.io", "relevanceScore": 80}]"#,
        );
        let (pipeline, _) = pipeline(provider, StaticPages::new());

        let fresh = pipeline
            .replace(&profile(), &[], 5, Some(&target()))
            .await
            .unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].name, "Beta");
    }

    #[tokio::test]
    async fn search_discovery_filters_search_results() {
        let provider = ScriptedProvider::new()
            .on(PromptKind::BusinessProfile, PROFILE)
            .on(PromptKind::SearchQueries, r#"["kanban tools"]"#)
            .on(
                PromptKind::FilterCompetitors,
                r#"[{"name": "Beta", "url": "https://beta.io", "relevanceScore": 90}]"#,
            );
        let search = StaticSearch::new().with_results(
            "kanban tools",
            vec![SearchResult {
                title: "Beta | Kanban".into(),
                url: "https://beta.io".into(),
                content: "Boards for teams".into(),
                score: Some(1.0),
            }],
        );
        let (pipeline, provider) = pipeline(provider, acme_pages());
        let pipeline = pipeline.with_search(Arc::new(search), 5);
        assert_eq!(pipeline.discovery_mode(), DiscoveryMode::Search);

        let handoff = pipeline.start(&target(), 3, &RecordingSink::new()).await.unwrap();

        assert_eq!(handoff.competitors.len(), 1);
        let filter_prompt = provider
            .prompts()
            .into_iter()
            .find(|p| p.kind == PromptKind::FilterCompetitors)
            .unwrap();
        assert!(filter_prompt.text.contains("1. Beta | Kanban\n   URL: https://beta.io"));
    }

    #[tokio::test]
    async fn empty_search_falls_back_to_inference() {
        let provider = acme_provider().on(PromptKind::SearchQueries, r#"["nothing matches"]"#);
        let (pipeline, provider) = pipeline(provider, acme_pages());
        let pipeline = pipeline.with_search(Arc::new(StaticSearch::new()), 5);

        let handoff = pipeline.start(&target(), 3, &RecordingSink::new()).await.unwrap();

        assert_eq!(handoff.competitors.len(), 3);
        assert!(
            provider
                .prompts()
                .iter()
                .any(|p| p.kind == PromptKind::InferCompetitors)
        );
    }
}
