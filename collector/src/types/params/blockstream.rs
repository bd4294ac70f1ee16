use std::fmt;
use std::time::Duration;

use url::Url;

use crate::cli::blockstream::BlockstreamCliArgs;
use crate::error::CollectorError;

#[derive(Clone)]
pub struct BlockstreamParams {
    pub api_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub http_timeout: Duration,
}

impl fmt::Debug for BlockstreamParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockstreamParams")
            .field("api_url", &self.api_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, CollectorError> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| CollectorError::ConfigError(format!("{name} is required")))
}

impl TryFrom<BlockstreamCliArgs> for BlockstreamParams {
    type Error = CollectorError;
    fn try_from(args: BlockstreamCliArgs) -> Result<Self, Self::Error> {
        if args.http_timeout_secs == 0 {
            return Err(CollectorError::ConfigError("COLLECTOR_HTTP_TIMEOUT_SECS must be at least 1".to_string()));
        }
        Ok(Self {
            api_url: args.api_url,
            client_id: required(args.client_id, "BLOCKSTREAM_CLIENT_ID")?,
            client_secret: required(args.client_secret, "BLOCKSTREAM_CLIENT_SECRET")?,
            token_url: args
                .token_url
                .ok_or_else(|| CollectorError::ConfigError("BLOCKSTREAM_TOKEN_URL is required".to_string()))?,
            http_timeout: Duration::from_secs(args.http_timeout_secs),
        })
    }
}
