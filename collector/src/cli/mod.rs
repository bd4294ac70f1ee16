use clap::{Parser, Subcommand};

pub mod blockstream;
pub mod collection;
pub mod market;
pub mod rate_limit;
pub mod storage;

#[derive(Parser, Debug)]
#[command(
    name = "chain-collector",
    about = "Chain Collector - resumable, rate-limited blockchain data archiver",
    long_about = "Chain Collector backfills a bounded window of block and fee history from the \
    Blockstream API into an S3 bucket, skipping anything already stored, and captures \
    point-in-time mempool and fee-estimate snapshots.",
    after_help = "Examples:\n  \
    chain-collector setup\n  \
    chain-collector run\n  \
    chain-collector run --current-only\n  \
    chain-collector market"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect snapshots and backfill historical data
    Run {
        #[command(flatten)]
        run_command: Box<RunCmd>,
    },
    /// Create the storage bucket if it does not exist
    Setup {
        #[command(flatten)]
        setup_command: Box<SetupCmd>,
    },
    /// Store one snapshot of FRED and CoinGecko reference data
    Market {
        #[command(flatten)]
        market_command: Box<MarketCmd>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct RunCmd {
    /// Only collect the current mempool and fee-estimate snapshots, skip the backfill
    #[arg(env = "COLLECTOR_CURRENT_ONLY", long, default_value_t = false)]
    pub current_only: bool,

    #[clap(flatten, next_help_heading = "Storage")]
    pub aws_s3_args: storage::aws_s3::AWSS3CliArgs,

    #[clap(flatten, next_help_heading = "Blockstream")]
    pub blockstream_args: blockstream::BlockstreamCliArgs,

    #[clap(flatten, next_help_heading = "Collection")]
    pub collection_args: collection::CollectionCliArgs,

    #[clap(flatten, next_help_heading = "Rate limit")]
    pub rate_limit_args: rate_limit::RateLimitCliArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct SetupCmd {
    #[clap(flatten, next_help_heading = "Storage")]
    pub aws_s3_args: storage::aws_s3::AWSS3CliArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct MarketCmd {
    #[clap(flatten, next_help_heading = "Storage")]
    pub aws_s3_args: storage::aws_s3::AWSS3CliArgs,

    #[clap(flatten, next_help_heading = "Market data")]
    pub market_args: market::MarketCliArgs,
}
