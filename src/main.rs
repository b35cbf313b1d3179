//! Token Radar - Near-real-time token analysis and alerting
//!
//! Reads newly discovered token candidates from a JSONL feed, runs each one
//! through the external analyzers, scores it, and raises Telegram alerts for
//! the ones that clear the gate.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use token_radar::analyzers::{Analyzer, HolderAnalyzer, LiquidityAnalyzer, SecurityAnalyzer};
use token_radar::config::Config;
use token_radar::models::TokenCandidate;
use token_radar::notify::{LogNotifier, Notifier, TelegramNotifier};
use token_radar::pipeline::worker::WorkerPool;
use token_radar::pipeline::Orchestrator;
use token_radar::scoring::DisabledScorer;
use token_radar::storage::JsonlStorage;

/// Token Radar - token analysis and alerting pipeline
#[derive(Parser)]
#[command(name = "radar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the pipeline against a candidate feed
    Start {
        /// JSONL candidate feed, one token per line ("-" for stdin)
        #[arg(long, default_value = "-")]
        feed: String,

        /// Log alerts instead of delivering them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("token_radar=info".parse()?),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Start { feed, dry_run } => start(&config, &feed, dry_run).await,
        Commands::Config => {
            println!("{}", config.masked_display());
            Ok(())
        }
    }
}

async fn start(config: &Config, feed: &str, dry_run: bool) -> Result<()> {
    let analyzers: Vec<Arc<dyn Analyzer>> = vec![
        Arc::new(SecurityAnalyzer::new(
            config.analyzers.security.base_url.clone(),
            config.analyzers.security.call_timeout(),
        )),
        Arc::new(LiquidityAnalyzer::new(
            config.analyzers.liquidity.base_url.clone(),
            config.analyzers.liquidity.call_timeout(),
        )),
        Arc::new(HolderAnalyzer::new(
            config.analyzers.holders.base_url.clone(),
            config.analyzers.holders.call_timeout(),
        )),
    ];

    let notifier: Arc<dyn Notifier> = if dry_run || !config.notifications.telegram.enabled {
        info!("Telegram delivery disabled, logging alerts instead");
        Arc::new(LogNotifier)
    } else {
        Arc::new(TelegramNotifier::new(&config.notifications.telegram))
    };

    let storage = Arc::new(JsonlStorage::new(&config.storage.path));

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        analyzers,
        Arc::new(DisabledScorer),
        storage,
        notifier,
    ));

    let pool = WorkerPool::spawn(
        Arc::clone(&orchestrator),
        config.pipeline.workers,
        config.pipeline.queue_capacity,
    );

    info!(feed, dry_run, "Pipeline started");

    let feed_result = tokio::select! {
        result = consume_feed(feed, &pool) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            Ok(())
        }
    };

    pool.shutdown().await;
    info!("Pipeline stopped");
    feed_result
}

/// Read candidates line by line and queue them for analysis
async fn consume_feed(feed: &str, pool: &WorkerPool) -> Result<()> {
    let mut submitted = 0u64;
    let mut malformed = 0u64;

    if feed == "-" {
        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            submit_line(&line, pool, &mut submitted, &mut malformed).await?;
        }
    } else {
        let file = tokio::fs::File::open(feed)
            .await
            .with_context(|| format!("Failed to open feed {}", feed))?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            submit_line(&line, pool, &mut submitted, &mut malformed).await?;
        }
    }

    info!(submitted, malformed, "Feed exhausted");
    Ok(())
}

async fn submit_line(
    line: &str,
    pool: &WorkerPool,
    submitted: &mut u64,
    malformed: &mut u64,
) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    match serde_json::from_str::<TokenCandidate>(line) {
        Ok(candidate) => {
            pool.submit(candidate).await?;
            *submitted += 1;
        }
        Err(e) => {
            warn!(error = %e, "Skipping malformed candidate line");
            *malformed += 1;
        }
    }
    Ok(())
}
