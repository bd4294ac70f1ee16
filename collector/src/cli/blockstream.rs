use clap::Args;
use url::Url;

/// Parameters for the Blockstream Enterprise API and its OAuth client-credentials login.
#[derive(Debug, Clone, Args)]
pub struct BlockstreamCliArgs {
    /// Base URL of the Esplora-compatible API.
    #[arg(
        env = "BLOCKSTREAM_API_URL",
        long = "blockstream-api-url",
        default_value = "https://enterprise.blockstream.info/api/"
    )]
    pub api_url: Url,

    #[arg(env = "BLOCKSTREAM_CLIENT_ID", long = "blockstream-client-id")]
    pub client_id: Option<String>,

    #[arg(env = "BLOCKSTREAM_CLIENT_SECRET", long = "blockstream-client-secret", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth token endpoint used for the client-credentials exchange.
    #[arg(env = "BLOCKSTREAM_TOKEN_URL", long = "blockstream-token-url")]
    pub token_url: Option<Url>,

    /// Bound on a single HTTP request to the API or the token endpoint, in seconds.
    #[arg(env = "COLLECTOR_HTTP_TIMEOUT_SECS", long = "http-timeout-secs", default_value_t = 20)]
    pub http_timeout_secs: u64,
}
