use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use compete_core::{AnalysisOutcome, EventSink, PipelineEvent, build_pipeline};
use compete_report::report_file_name;
use compete_shared::{
    AppConfig, CompeteError, Depth, Level, Limiters, config_file_path, init_config, load_config,
    validate_competitor_count, validate_public_url,
};

/// Highlights printed per category after a run.
const SUMMARY_HIGHLIGHTS: usize = 3;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "compete",
    version,
    about = "Generate competitive analysis reports from a company URL"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// How much model output to budget per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DepthArg {
    Quick,
    Normal,
    Deep,
}

impl From<DepthArg> for Depth {
    fn from(arg: DepthArg) -> Self {
        match arg {
            DepthArg::Quick => Depth::Quick,
            DepthArg::Normal => Depth::Normal,
            DepthArg::Deep => Depth::Deep,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze a company website against its competitors
    Analyze {
        /// Target company URL
        url: String,

        /// Number of competitors to analyze (1-10)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
        competitors: Option<u8>,

        /// Report output path (defaults to <company>-competitive-analysis.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Analysis depth
        #[arg(short, long)]
        depth: Option<DepthArg>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Create default config file
    Init,
    /// Show current configuration
    Show,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

pub fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match cli.verbose {
            0 => "compete=info",
            1 => "compete=debug",
            _ => "compete=trace",
        };
        EnvFilter::new(level)
    });

    match cli.log_format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze {
            url,
            competitors,
            output,
            depth,
        } => cmd_analyze(&url, competitors, output, depth).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

async fn cmd_analyze(
    url: &str,
    competitors: Option<u8>,
    output: Option<PathBuf>,
    depth: Option<DepthArg>,
) -> Result<()> {
    let config = load_config()?;
    let url = validate_public_url(url)?;
    let count = competitor_count(competitors, &config)?;
    let depth = depth.map(Depth::from).unwrap_or(config.defaults.depth);

    info!(%url, count, ?depth, "starting analysis");

    let limiters = Limiters::from_config(&config.limits);
    let pipeline = build_pipeline(&config, &limiters, depth)?;

    let spinner = SpinnerSink::new();
    let result = pipeline.run_full(&url, count, &spinner).await;
    spinner.finish();
    let outcome = result?;

    let path = output.unwrap_or_else(|| PathBuf::from(report_file_name(&outcome.company_name)));
    std::fs::write(&path, &outcome.report).map_err(|e| CompeteError::io(&path, e))?;
    info!(path = %path.display(), "report written");

    print_summary(&outcome, &path);
    Ok(())
}

fn competitor_count(flag: Option<u8>, config: &AppConfig) -> Result<usize> {
    let requested = flag.map(i64::from).unwrap_or(i64::from(config.defaults.competitors));
    validate_competitor_count(requested).wrap_err("invalid competitor count")
}

fn print_summary(outcome: &AnalysisOutcome, path: &Path) {
    println!();
    println!("Competitive analysis complete");
    println!("  Company:     {}", outcome.company_name);
    println!("  Competitors: {} analyzed", outcome.analyses.len());
    println!("  Report:      {}", path.display());

    let recs = &outcome.recommendations;
    let opportunities: Vec<&str> = recs
        .opportunities
        .iter()
        .filter(|o| o.priority == Level::High)
        .take(SUMMARY_HIGHLIGHTS)
        .map(|o| o.title.as_str())
        .collect();
    let threats: Vec<&str> = recs
        .threats
        .iter()
        .filter(|t| t.severity == Level::High)
        .take(SUMMARY_HIGHLIGHTS)
        .map(|t| t.title.as_str())
        .collect();

    if !opportunities.is_empty() {
        println!();
        println!("Top opportunities:");
        for title in opportunities {
            println!("  + {title}");
        }
    }
    if !threats.is_empty() {
        println!();
        println!("Key threats:");
        for title in threats {
            println!("  ! {title}");
        }
    }
}

/// Renders pipeline progress on a terminal spinner.
struct SpinnerSink {
    bar: ProgressBar,
}

impl SpinnerSink {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl EventSink for SpinnerSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Progress { message, .. } => self.bar.set_message(message),
            PipelineEvent::Profile {
                company_name,
                industry,
            } => self
                .bar
                .println(format!("  Company: {company_name} ({industry})")),
            PipelineEvent::Competitors(list) => {
                self.bar.println(format!("  Competitors ({}):", list.len()));
                for c in list {
                    self.bar.println(format!(
                        "    - {} {} [{:.0}]",
                        c.name, c.url, c.relevance_score
                    ));
                }
            }
            PipelineEvent::Complete { .. } | PipelineEvent::Error { .. } => {}
        }
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;

    println!("Config file: {}", path.display());
    println!("Exists: {}", path.exists());
    println!();

    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
