//! `appscope` command line interface.

mod output;
mod pipeline;
mod query;

use anyhow::Context;
use appscope_analytics::{QueryError, QueryParams};
use appscope_core::{AppConfig, ConfigError, Platform};
use appscope_ingest::IngestError;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::pipeline::Stage;

#[derive(Debug, Parser)]
#[command(name = "appscope")]
#[command(about = "App-market and campaign intelligence pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run every stage and write all reports.
    Run {
        /// Use only the local app export; no lookup requests are made.
        #[arg(long)]
        skip_enrichment: bool,
    },
    /// Run one stage (and whatever it needs in memory) and write its artifact.
    Stage {
        #[arg(value_enum)]
        stage: Stage,
        #[arg(long)]
        skip_enrichment: bool,
    },
    /// Answer a named query over the last written `unified_apps.json`.
    Query {
        /// Query name, e.g. `compare-platforms`.
        #[arg(required_unless_present = "interactive", conflicts_with = "interactive")]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        platform: Option<Platform>,
        #[arg(long)]
        min_rating: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
        /// Read queries from stdin until `quit`.
        #[arg(long)]
        interactive: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            exit_code(&error)
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = appscope_core::load_app_config().context("failed to load configuration")?;
    init_logging(&config)?;
    tracing::debug!(env = %config.env, "configuration loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(dispatch(cli.command, &config))
}

fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "APPSCOPE_LOG_LEVEL".to_string(),
            reason: e.to_string(),
        })?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn dispatch(command: Commands, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run { skip_enrichment } => pipeline::run_all(config, skip_enrichment).await,
        Commands::Stage {
            stage,
            skip_enrichment,
        } => pipeline::run_stage(config, stage, skip_enrichment).await,
        Commands::Query {
            name,
            category,
            platform,
            min_rating,
            limit,
            interactive,
        } => {
            if interactive {
                return query::run_interactive(config);
            }
            let Some(name) = name else {
                anyhow::bail!("a query name is required unless --interactive is given");
            };
            let params = QueryParams {
                category,
                platform,
                min_rating,
                limit,
            };
            query::run_named(config, &name, &params)
        }
    }
}

/// Maps the root cause of a failed command to the process exit status.
fn exit_code(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(ingest) = cause.downcast_ref::<IngestError>() {
            return if ingest.is_input_format() { 2 } else { 1 };
        }
        if let Some(QueryError::UnknownQuery(_)) = cause.downcast_ref::<QueryError>() {
            return 3;
        }
        if cause.is::<ConfigError>() {
            return 4;
        }
    }
    1
}

#[cfg(test)]
mod tests;
