use std::sync::Arc;

use chain_collector::cli::{Cli, Commands, MarketCmd, RunCmd, SetupCmd};
use chain_collector::core::config::{build_storage, Config};
use chain_collector::setup::setup;
use chain_collector::types::params::{MarketParams, StorageParams};
use chain_collector::utils::logging::init_logging;
use chain_collector::utils::signal_handler::SignalHandler;
use chain_collector::utils::startup_info::log_startup_info;
use chain_collector::worker::fetcher::Fetcher;
use chain_collector::worker::market::MarketCollector;
use chain_collector::worker::Pipeline;
use chain_collector::{CollectorError, CollectorResult};
use clap::Parser as _;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();
    info!("Starting chain collector");
    let cli = Cli::parse();

    let (result, action) = match &cli.command {
        Commands::Run { run_command } => (run_collector(run_command).await, "run collector"),
        Commands::Setup { setup_command } => (setup_collector(setup_command).await, "set up collector"),
        Commands::Market { market_command } => (collect_market_data(market_command).await, "collect market data"),
    };

    if let Err(e) = result {
        error!(error = %e, error_chain = ?e, "Failed to {}", action);
        std::process::exit(1);
    }
}

async fn run_collector(run_cmd: &RunCmd) -> CollectorResult<()> {
    let config = Config::from_run_cmd(run_cmd).await?;
    log_startup_info(&config.params);

    let token = CancellationToken::new();
    let _signal_task = SignalHandler::new(token.clone()).spawn()?;

    config.s3().setup().await?;

    // Credentials are checked once up front so a misconfiguration fails before any collection.
    config.token_provider.token().await?;
    info!("Authenticated against upstream API");

    let fetcher = Arc::new(Fetcher::new(Arc::clone(&config.upstream), config.params.rate.clone()));
    let pipeline = Pipeline::new(
        Arc::clone(&config.storage),
        Arc::clone(&fetcher),
        config.params.collection.clone(),
        config.params.loop_params.clone(),
        config.params.settings_summary(),
    );

    let summary = pipeline.run(config.params.mode, &token).await?;
    debug!(requests = fetcher.request_count(), "Upstream requests issued");

    for run in &summary.backfills {
        info!(
            kind = %run.kind,
            state = ?run.state,
            completed = run.completed,
            failed = run.failed,
            remaining = run.remaining,
            "Backfill finished"
        );
    }
    let failed_snapshots = summary.snapshots.iter().filter(|s| !s.is_ok()).count();
    if failed_snapshots > 0 {
        warn!(failed = failed_snapshots, "Some snapshots were not collected");
    }
    if summary.interrupted {
        info!("Collection interrupted, the next run resumes from storage");
    }
    summary.ensure_not_aborted()
}

async fn setup_collector(setup_cmd: &SetupCmd) -> CollectorResult<()> {
    setup(setup_cmd).await?;
    info!("Collector setup completed successfully");
    Ok(())
}

async fn collect_market_data(market_cmd: &MarketCmd) -> CollectorResult<()> {
    let storage_params = StorageParams::try_from(market_cmd.aws_s3_args.clone())?;
    let market_params = MarketParams::from(market_cmd.market_args.clone());
    let s3 = build_storage(&storage_params).await;
    s3.setup().await?;

    let outcomes = MarketCollector::new(Arc::new(s3), market_params).collect().await;
    if outcomes.is_empty() {
        return Err(CollectorError::ConfigError("No market data source is configured".to_string()));
    }
    let stored = outcomes.iter().filter(|o| o.is_ok()).count();
    info!(stored, attempted = outcomes.len(), "Market data collection finished");
    Ok(())
}
