use crate::cli::market::MarketCliArgs;

#[derive(Clone)]
pub struct MarketParams {
    pub fred_api_key: Option<String>,
    pub fred_base_url: Option<String>,
    pub fred_series: Vec<String>,
    pub coingecko_api_key: Option<String>,
    pub coingecko_base_url: Option<String>,
    pub coin_ids: Vec<String>,
    pub vs_currencies: Vec<String>,
}

fn non_empty(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect()
}

impl From<MarketCliArgs> for MarketParams {
    fn from(args: MarketCliArgs) -> Self {
        Self {
            fred_api_key: args.fred_api_key.filter(|k| !k.is_empty()),
            fred_base_url: args.fred_base_url,
            fred_series: non_empty(args.fred_series),
            coingecko_api_key: args.coingecko_api_key.filter(|k| !k.is_empty()),
            coingecko_base_url: args.coingecko_base_url,
            coin_ids: non_empty(args.coin_ids),
            vs_currencies: non_empty(args.vs_currencies),
        }
    }
}
