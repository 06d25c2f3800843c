//! testforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Run completed (individual artifacts, the build or the tests may still have failed)
//! - 1: Fatal error (configuration, no sources, no generated tests, held lock)

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

mod cli;
mod summary;

use cli::{Cli, OutputFormat};
use forge_config::ConfigLoader;
use forge_core::PipelineDriver;
use forge_llm::{OllamaClient, OllamaConfig};
use forge_toolchain::ProcessRunner;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const FATAL: u8 = 1;
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env().add_directive(LevelFilter::WARN.into());
    for directive in [format!("testforge={}", level), format!("forge_core={}", level)] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Ignore the error when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing current step");
            signal_token.cancel();
        }
    });

    match run(cli, cancel).await {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(ExitCodes::FATAL)
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let rules = ConfigLoader::new(&cli.config_dir)
        .load()
        .with_context(|| format!("Failed to load prompt rules from {:?}", cli.config_dir))?;

    let llm_config = cli.llm_config(OllamaConfig::from_env()?);
    info!("Using model {} at {}", llm_config.model, llm_config.endpoint);
    let llm = OllamaClient::new(llm_config).context("Failed to create completion client")?;

    let toolchain = cli.toolchain();
    let runner = ProcessRunner::new(toolchain.timeout_seconds);

    let driver = PipelineDriver::new(Arc::new(rules), Arc::new(llm), Arc::new(runner), toolchain)
        .with_options(cli.pipeline_options())
        .with_cancellation(cancel);

    let run = driver
        .run_path(&cli.source_path)
        .await
        .with_context(|| format!("Run failed for {:?}", cli.source_path))?;

    match cli.format {
        OutputFormat::Text => print!("{}", summary::render_text(&run)),
        OutputFormat::Json => println!("{}", summary::render_json(&run)?),
    }

    Ok(())
}
