pub mod blockstream;
pub mod collection;
pub mod market;
pub mod rate;

pub use blockstream::BlockstreamParams;
pub use collection::{CollectionParams, LoopParams};
pub use market::MarketParams;
pub use rate::RateBudget;
use url::Url;

use crate::cli::storage::aws_s3::AWSS3CliArgs;
use crate::error::CollectorError;

/// StorageParams - Location of the bucket every object is archived to
#[derive(Debug, Clone)]
pub struct StorageParams {
    pub bucket_name: String,
    pub endpoint_url: Option<Url>,
}

/// S3 bucket naming rules: 3-63 characters of lowercase letters, digits, dots
/// and hyphens, starting and ending with a letter or digit.
fn validate_bucket_name(name: &str) -> Result<(), CollectorError> {
    let valid_chars = name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_edges = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if (3..=63).contains(&name.len()) && valid_chars && valid_edges {
        Ok(())
    } else {
        Err(CollectorError::ConfigError(format!("Invalid bucket name: {name}")))
    }
}

impl TryFrom<AWSS3CliArgs> for StorageParams {
    type Error = CollectorError;
    fn try_from(args: AWSS3CliArgs) -> Result<Self, Self::Error> {
        let bucket_name = args
            .bucket_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CollectorError::ConfigError("COLLECTOR_AWS_S3_BUCKET_NAME is required".to_string()))?;
        validate_bucket_name(&bucket_name)?;
        Ok(Self { bucket_name, endpoint_url: args.s3_endpoint_url })
    }
}
