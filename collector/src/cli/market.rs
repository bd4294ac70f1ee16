use clap::Args;

/// Reference market data sources. A source without its API key is skipped.
#[derive(Debug, Clone, Args)]
pub struct MarketCliArgs {
    #[arg(env = "FRED_API_KEY", long, hide_env_values = true)]
    pub fred_api_key: Option<String>,

    #[arg(env = "FRED_BASE_URL", long)]
    pub fred_base_url: Option<String>,

    /// FRED series ids to snapshot, comma separated.
    #[arg(env = "COLLECTOR_FRED_SERIES", long, value_delimiter = ',', default_value = "DFF")]
    pub fred_series: Vec<String>,

    #[arg(env = "COINGECKO_API_KEY", long, hide_env_values = true)]
    pub coingecko_api_key: Option<String>,

    #[arg(env = "COINGECKO_BASE_URL", long)]
    pub coingecko_base_url: Option<String>,

    /// CoinGecko coin ids to price, comma separated.
    #[arg(env = "COLLECTOR_COINGECKO_COIN_IDS", long, value_delimiter = ',', default_value = "bitcoin")]
    pub coin_ids: Vec<String>,

    #[arg(env = "COLLECTOR_COINGECKO_VS_CURRENCIES", long, value_delimiter = ',', default_value = "usd")]
    pub vs_currencies: Vec<String>,
}
