use clap::Args;
use url::Url;

/// Parameters used to config AWS S3.
#[derive(Debug, Clone, Args)]
pub struct AWSS3CliArgs {
    /// Name of the bucket holding every collected object.
    #[arg(env = "COLLECTOR_AWS_S3_BUCKET_NAME", long)]
    pub bucket_name: Option<String>,

    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    /// Path-style addressing is always used.
    #[arg(env = "COLLECTOR_AWS_S3_ENDPOINT_URL", long)]
    pub s3_endpoint_url: Option<Url>,
}
