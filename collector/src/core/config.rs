use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::cli::RunCmd;
use crate::core::client::auth::{OAuthClientCredentials, TokenProvider};
use crate::core::client::http_client;
use crate::core::client::storage::{s3::AWSS3, StorageClient};
use crate::core::client::upstream::{blockstream::BlockstreamClient, UpstreamClient};
use crate::error::{CollectorError, CollectorResult};
use crate::types::params::{BlockstreamParams, CollectionParams, LoopParams, RateBudget, StorageParams};

/// Invocation mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Snapshots plus historical backfill
    Full,
    /// Snapshots only
    CurrentOnly,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => write!(f, "full"),
            RunMode::CurrentOnly => write!(f, "current_only"),
        }
    }
}

/// Validated parameters of the `run` command.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub mode: RunMode,
    pub storage: StorageParams,
    pub blockstream: BlockstreamParams,
    pub collection: CollectionParams,
    pub loop_params: LoopParams,
    pub rate: RateBudget,
}

impl TryFrom<RunCmd> for RunParams {
    type Error = CollectorError;
    fn try_from(run_cmd: RunCmd) -> Result<Self, Self::Error> {
        Ok(Self {
            mode: if run_cmd.current_only { RunMode::CurrentOnly } else { RunMode::Full },
            storage: StorageParams::try_from(run_cmd.aws_s3_args)?,
            blockstream: BlockstreamParams::try_from(run_cmd.blockstream_args)?,
            collection: CollectionParams::try_from(run_cmd.collection_args.clone())?,
            loop_params: LoopParams::try_from(run_cmd.collection_args)?,
            rate: RateBudget::try_from(run_cmd.rate_limit_args)?,
        })
    }
}

impl RunParams {
    /// Settings recorded in the run summary. Credentials are left out.
    pub fn settings_summary(&self) -> Value {
        json!({
            "bucket": self.storage.bucket_name,
            "api_url": self.blockstream.api_url.as_str(),
            "http_timeout_secs": self.blockstream.http_timeout.as_secs(),
            "lookback_days": self.collection.lookback_days,
            "blocks_per_day": self.collection.blocks_per_day,
            "sample_stride": self.collection.sample_stride,
            "first_valid_height": self.collection.first_valid_height.height(),
            "base_delay_secs": self.rate.base_delay.as_secs_f64(),
            "max_retries": self.rate.max_retries,
            "retry_base_delay_secs": self.rate.retry_base_delay,
            "burst_interval": self.rate.burst_interval,
            "burst_delay_secs": self.rate.burst_extra_delay.as_secs_f64(),
            "batch_size": self.loop_params.batch_size,
            "batch_pause_secs": self.loop_params.batch_pause.as_secs_f64(),
            "checkpoint_every": self.loop_params.checkpoint_every,
            "max_failures": self.loop_params.max_failures,
        })
    }
}

/// Build the S3 client from the ambient AWS environment.
pub async fn build_storage(params: &StorageParams) -> AWSS3 {
    let aws_config = aws_config::from_env().load().await;
    AWSS3::new(&aws_config, params)
}

/// Everything a `run` needs: validated params and the external clients.
pub struct Config {
    pub params: RunParams,
    pub storage: Arc<dyn StorageClient>,
    pub token_provider: Arc<dyn TokenProvider>,
    pub upstream: Arc<dyn UpstreamClient>,
    s3: AWSS3,
}

impl Config {
    pub async fn from_run_cmd(run_cmd: &RunCmd) -> CollectorResult<Self> {
        let params = RunParams::try_from(run_cmd.clone())?;
        let s3 = build_storage(&params.storage).await;
        let http = http_client(params.blockstream.http_timeout)
            .map_err(|e| CollectorError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        let token_provider: Arc<dyn TokenProvider> =
            Arc::new(OAuthClientCredentials::new(&params.blockstream, http.clone()));
        let upstream: Arc<dyn UpstreamClient> =
            Arc::new(BlockstreamClient::new(params.blockstream.api_url.clone(), Arc::clone(&token_provider), http));

        Ok(Self { params, storage: Arc::new(s3.clone()), token_provider, upstream, s3 })
    }

    pub fn s3(&self) -> &AWSS3 {
        &self.s3
    }
}
