//! Markdown report rendering.
//!
//! [`render`] is pure: the same inputs (and date) always give the same text.
//! Sections appear in a fixed order separated by horizontal rules, and a
//! subsection whose list is empty is left out.

use chrono::{Local, NaiveDate};

use compete_shared::{
    BusinessProfile, CompetitorAnalysis, Level, MarketAnalysis, StrategicRecommendations,
};

/// Separator placed between top-level sections.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Suffix of the default report file name.
const FILE_SUFFIX: &str = "-competitive-analysis.md";

/// How many high-level items the executive summary lists.
const SUMMARY_ITEMS: usize = 3;

/// How many features the landscape table shows per company.
const TABLE_FEATURES: usize = 3;

/// Render the full report, dated today.
pub fn render(
    target_url: &str,
    profile: &BusinessProfile,
    analyses: &[CompetitorAnalysis],
    market: &MarketAnalysis,
    recommendations: &StrategicRecommendations,
) -> String {
    render_at(
        target_url,
        profile,
        analyses,
        market,
        recommendations,
        Local::now().date_naive(),
    )
}

/// Render the full report with an explicit generation date.
pub fn render_at(
    target_url: &str,
    profile: &BusinessProfile,
    analyses: &[CompetitorAnalysis],
    market: &MarketAnalysis,
    recommendations: &StrategicRecommendations,
    date: NaiveDate,
) -> String {
    [
        header(profile, date),
        executive_summary(recommendations),
        target_analysis(target_url, profile),
        competitor_profiles(analyses),
        landscape_table(profile, analyses),
        market_section(market),
        recommendations_section(recommendations),
        footer(),
    ]
    .join(SECTION_SEPARATOR)
}

/// Lowercase, dash-separated form of `name` for file names.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Default output file name for a company's report.
pub fn report_file_name(company_name: &str) -> String {
    let slug = slugify(company_name);
    if slug.is_empty() {
        format!("report{FILE_SUFFIX}")
    } else {
        format!("{slug}{FILE_SUFFIX}")
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn header(profile: &BusinessProfile, date: NaiveDate) -> String {
    format!(
        "# Competitive Analysis Report: {name}\n\n\
         **Industry:** {industry}\n\
         **Generated:** {date}\n\n\
         > This report analyses the competitive landscape, market positioning and strategic options of {name}.",
        name = profile.company_name,
        industry = profile.industry,
        date = date.format("%B %-d, %Y"),
    )
}

fn executive_summary(recs: &StrategicRecommendations) -> String {
    let mut out = format!("## 1. Executive Summary\n\n{}", recs.summary);

    let opportunities: Vec<String> = recs
        .opportunities
        .iter()
        .filter(|o| o.priority == Level::High)
        .take(SUMMARY_ITEMS)
        .map(|o| format!("- **{}:** {}", o.title, o.description))
        .collect();
    subsection(&mut out, "### Key Opportunities", &opportunities.join("\n"));

    let threats: Vec<String> = recs
        .threats
        .iter()
        .filter(|t| t.severity == Level::High)
        .take(SUMMARY_ITEMS)
        .map(|t| format!("- **{}:** {}", t.title, t.description))
        .collect();
    subsection(&mut out, "### Critical Threats", &threats.join("\n"));

    out
}

fn target_analysis(url: &str, profile: &BusinessProfile) -> String {
    let mut out = format!(
        "## 2. Target Company Analysis\n\n\
         ### Company Overview\n\
         **Company:** {}\n\
         **Website:** {url}\n\
         **Industry:** {}\n\n\
         {}",
        profile.company_name, profile.industry, profile.description,
    );

    subsection(&mut out, "### Value Proposition", &profile.value_proposition);
    subsection(&mut out, "### Target Audience", &profile.target_audience);
    subsection(&mut out, "### Key Features", &bullets(&profile.key_features));
    if let Some(pricing) = &profile.pricing_model {
        subsection(&mut out, "### Pricing Model", pricing);
    }
    if let Some(stack) = &profile.tech_stack {
        subsection(&mut out, "### Technology Stack", &bullets(stack));
    }

    out
}

fn competitor_profiles(analyses: &[CompetitorAnalysis]) -> String {
    let mut out = String::from("## 3. Competitor Profiles");

    for (i, a) in analyses.iter().enumerate() {
        out.push_str(&format!(
            "\n\n### {}. {}\n\n**Website:** {}\n\n{}",
            i + 1,
            a.company_name,
            a.url,
            a.overview
        ));
        subsection(&mut out, "#### Strengths", &bullets(&a.strengths));
        subsection(&mut out, "#### Weaknesses", &bullets(&a.weaknesses));
        subsection(&mut out, "#### Key Features", &bullets(&a.key_features));
        subsection(&mut out, "#### Pricing", &a.pricing_model);
        subsection(&mut out, "#### Target Market", &a.target_market);
        subsection(&mut out, "#### Key Differentiators", &bullets(&a.differentiators));
    }

    out
}

fn landscape_table(target: &BusinessProfile, analyses: &[CompetitorAnalysis]) -> String {
    let mut rows = vec![table_row(
        &format!("{} (Target)", target.company_name),
        &target.key_features,
        target.pricing_model.as_deref().unwrap_or("N/A"),
    )];
    rows.extend(
        analyses
            .iter()
            .map(|a| table_row(&a.company_name, &a.key_features, &a.pricing_model)),
    );

    format!(
        "## 4. Competitive Landscape Overview\n\n\
         | Company | Key Features | Pricing |\n\
         |---------|--------------|---------|\n\
         {}",
        rows.join("\n")
    )
}

fn table_row(name: &str, features: &[String], pricing: &str) -> String {
    let features = features
        .iter()
        .take(TABLE_FEATURES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "| {} | {} | {} |",
        cell(name),
        cell(&features),
        cell(pricing)
    )
}

fn market_section(market: &MarketAnalysis) -> String {
    let mut out = String::from("## 5. Market Analysis");

    subsection(&mut out, "### Market Overview", &market.market_overview);

    let segments = market
        .market_segments
        .iter()
        .map(|s| {
            format!(
                "#### {}\n{}\n\n**Key Players:** {}",
                s.name,
                s.description,
                s.players.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    subsection(&mut out, "### Market Segments", &segments);

    subsection(&mut out, "### Competitive Positioning", &market.competitive_positioning);
    subsection(&mut out, "### Market Trends", &bullets(&market.market_trends));
    subsection(&mut out, "### Entry Barriers", &bullets(&market.entry_barriers));

    out
}

fn recommendations_section(recs: &StrategicRecommendations) -> String {
    let mut out = String::from("## 6. Strategic Recommendations");

    let mut opportunities: Vec<_> = recs.opportunities.iter().collect();
    opportunities.sort_by_key(|o| o.priority);
    let opportunities = opportunities
        .iter()
        .map(|o| {
            format!(
                "#### {} [{} PRIORITY]\n{}",
                o.title,
                o.priority.as_upper(),
                o.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    subsection(&mut out, "### Opportunities", &opportunities);

    let mut threats: Vec<_> = recs.threats.iter().collect();
    threats.sort_by_key(|t| t.severity);
    let threats = threats
        .iter()
        .map(|t| {
            format!(
                "#### {} [{} SEVERITY]\n{}",
                t.title,
                t.severity.as_upper(),
                t.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    subsection(&mut out, "### Threats", &threats);

    let actions = recs
        .recommendations
        .iter()
        .map(|r| {
            let mut block = format!("#### {}\n{}", r.title, r.description);
            subsection(&mut block, "**Action Items:**", &bullets(&r.action_items));
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    subsection(&mut out, "### Recommendations", &actions);

    out
}

fn footer() -> String {
    "## About This Report\n\n\
     This competitive analysis was generated from publicly available website content with the help of a language model. \
     Details may be incomplete or out of date.\n\n\
     **Methodology:**\n\
     1. Target company website analysis\n\
     2. Competitor discovery\n\
     3. Individual competitor website analysis\n\
     4. Market synthesis and strategic recommendations\n\n\
     **Disclaimer:** This report is for informational purposes only. Verify critical business decisions with further research.\n\n\
     *Generated by compete*"
        .to_string()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append `heading` and `body` to `out`, unless `body` is blank.
fn subsection(out: &mut String, heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(heading);
    out.push('\n');
    out.push_str(body);
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep table cells on one line and free of column separators.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
