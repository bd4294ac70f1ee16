use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};

use crate::core::client::storage::{StorageClient, StorageError};
use crate::types::params::StorageParams;

#[derive(Clone, Debug)]
pub struct AWSS3 {
    pub(crate) client: Arc<Client>,
    bucket_name: String,
}

impl AWSS3 {
    /// Creates a new instance of AWSS3 with the provided AWS configuration.
    ///
    /// A custom endpoint from `params` replaces the regional one, which is how
    /// S3-compatible stores are reached. Path-style addressing is always on.
    pub fn new(aws_config: &SdkConfig, params: &StorageParams) -> Self {
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(aws_config);
        if let Some(endpoint) = &params.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint.as_str());
        }
        s3_config_builder = s3_config_builder.force_path_style(true);

        let client = Client::from_conf(s3_config_builder.build());
        Self { client: Arc::new(client), bucket_name: params.bucket_name.clone() }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Returns one page of keys and the continuation token of the next page, if any.
    async fn list_page(
        client: Arc<Client>,
        bucket: String,
        prefix: String,
        continuation_token: Option<String>,
    ) -> Result<(Vec<String>, Option<String>), StorageError> {
        let output = client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await?;

        let keys = output.contents().iter().filter_map(|object| object.key().map(str::to_string)).collect();
        let next = match (output.is_truncated(), output.next_continuation_token()) {
            (Some(true), Some(token)) => Some(token.to_string()),
            _ => None,
        };
        Ok((keys, next))
    }
}

#[async_trait]
impl StorageClient for AWSS3 {
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError> {
        let output = self.client.get_object().bucket(&self.bucket_name).key(key).send().await?;

        let data = output.body.collect().await.map_err(|e| StorageError::ObjectStreamError(e.to_string()))?;

        Ok(data.into_bytes())
    }

    /// S3 PUT is atomic: readers see either the previous object or the new one.
    async fn put_data(&self, data: Bytes, key: &str) -> Result<(), StorageError> {
        self.client.put_object().bucket(&self.bucket_name).key(key).body(data.into()).send().await?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(&self.bucket_name).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list_keys(&self, prefix: &str) -> BoxStream<'static, Result<String, StorageError>> {
        let client = Arc::clone(&self.client);
        let bucket = self.bucket_name.clone();
        let prefix = prefix.to_string();

        // State is the token of the page still to fetch, `None` once the listing is exhausted.
        stream::try_unfold(Some(None::<String>), move |state| {
            let (client, bucket, prefix) = (Arc::clone(&client), bucket.clone(), prefix.clone());
            async move {
                let Some(token) = state else {
                    return Ok::<_, StorageError>(None);
                };
                let (keys, next) = Self::list_page(client, bucket, prefix, token).await?;
                let page = stream::iter(keys.into_iter().map(Ok::<_, StorageError>));
                Ok(Some((page, next.map(Some))))
            }
        })
        .try_flatten()
        .boxed()
    }
}
