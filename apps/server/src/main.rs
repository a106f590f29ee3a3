//! compete-server: HTTP and server-sent-events front end for the analysis
//! pipeline.

mod routes;

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use compete_core::build_pipeline;
use compete_shared::{Limiters, load_config, validate_competitor_count};

use routes::AppState;

#[derive(Parser)]
#[command(name = "compete-server", version, about = "Serve the compete analysis API")]
struct Cli {
    /// Bind address (overrides `[server] host`)
    #[arg(long, env = "COMPETE_HOST")]
    host: Option<String>,

    /// Port (overrides `[server] port`)
    #[arg(short, long, env = "COMPETE_PORT")]
    port: Option<u16>,

    /// Log output format
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match cli.verbose {
            0 => "compete=info",
            1 => "compete=debug",
            _ => "compete=trace",
        };
        EnvFilter::new(level)
    });

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = load_config()?;
    let default_count = validate_competitor_count(i64::from(config.defaults.competitors))
        .wrap_err("invalid [defaults] competitors")?;

    // Limiters are process-wide: every request shares the same budgets.
    let limiters = Limiters::from_config(&config.limits);
    let pipeline = build_pipeline(&config, &limiters, config.defaults.depth)
        .wrap_err("failed to configure the analysis pipeline")?;

    let app = routes::router(AppState::new(Arc::new(pipeline), default_count));

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .wrap_err_with(|| format!("failed to bind {host}:{port}"))?;

    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
