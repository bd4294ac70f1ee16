use tracing::info;

use crate::cli::SetupCmd;
use crate::core::config::build_storage;
use crate::error::CollectorResult;
use crate::types::params::StorageParams;

pub(crate) mod aws;

/// Setup function that creates the storage bucket when it is missing
pub async fn setup(setup_cmd: &SetupCmd) -> CollectorResult<()> {
    let storage_params = StorageParams::try_from(setup_cmd.aws_s3_args.clone())?;
    info!(bucket = %storage_params.bucket_name, "Setting up storage for the collector");

    let s3 = build_storage(&storage_params).await;
    s3.setup().await
}
