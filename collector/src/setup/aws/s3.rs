use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use tracing::{info, warn};

use crate::core::client::storage::s3::AWSS3;
use crate::error::{CollectorError, CollectorResult};

impl AWSS3 {
    pub async fn check_if_exists(&self) -> bool {
        self.client.head_bucket().bucket(self.bucket_name()).send().await.is_ok()
    }

    /// Create the bucket unless it already exists. Safe to call on every run.
    pub async fn setup(&self) -> CollectorResult<()> {
        let bucket_name = self.bucket_name();
        if self.check_if_exists().await {
            warn!(" ⏭️  S3 bucket '{}' already exists", bucket_name);
            return Ok(());
        }
        info!("Creating New Bucket: {}", bucket_name);

        let region = self.client.config().region().map(|r| r.to_string()).unwrap_or_else(|| "us-east-1".to_string());
        info!("Creating bucket in region: {}", region);

        let mut bucket_builder = self.client.create_bucket().bucket(bucket_name);
        if region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(region.as_str());
            let cfg = CreateBucketConfiguration::builder().location_constraint(constraint).build();
            bucket_builder = bucket_builder.create_bucket_configuration(cfg);
        }

        match bucket_builder.send().await {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_bucket_already_owned_by_you()) => {
                warn!("S3 bucket '{}' was created concurrently", bucket_name);
                Ok(())
            }
            Err(e) => Err(CollectorError::SetupError(format!("Failed to create S3 bucket '{}': {:?}", bucket_name, e))),
        }
    }
}
