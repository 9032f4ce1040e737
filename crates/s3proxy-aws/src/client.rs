//! The Amazon S3 backed [`ObjectStore`].

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use s3proxy_core::{ObjectStore, ProxyConfig};
use s3proxy_model::{
    DeleteObjectInput, GetObjectInput, GetObjectOutput, ListObjectsV2Input, ListObjectsV2Output,
    PutObjectInput, PutObjectOutput, StoreError,
};
use tracing::{debug, info};

use crate::convert::{convert_get_output, convert_list_output, to_sdk_datetime};
use crate::error::map_sdk_error;

/// Object store backed by an S3 (or S3-compatible) service.
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: Client,
}

impl AwsObjectStore {
    /// Build a client from the default credential chain and the proxy settings.
    pub async fn connect(config: &ProxyConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .accelerate(config.use_accelerate);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            region = ?sdk_config.region(),
            endpoint = ?config.endpoint,
            force_path_style = config.force_path_style,
            use_accelerate = config.use_accelerate,
            "initialized S3 client"
        );

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, StoreError> {
        debug!(bucket = %input.bucket, key = %input.key, "GetObject");
        let output = self
            .client
            .get_object()
            .bucket(&input.bucket)
            .key(&input.key)
            .set_range(input.range)
            .set_if_match(input.if_match)
            .set_if_none_match(input.if_none_match)
            .set_if_modified_since(input.if_modified_since.map(to_sdk_datetime))
            .set_if_unmodified_since(input.if_unmodified_since.map(to_sdk_datetime))
            .send()
            .await
            .map_err(|err| map_sdk_error(err, &input.key))?;
        Ok(convert_get_output(output))
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, StoreError> {
        debug!(bucket = %input.bucket, key = %input.key, len = input.body.len(), "PutObject");
        let output = self
            .client
            .put_object()
            .bucket(&input.bucket)
            .key(&input.key)
            .body(ByteStream::from(input.body))
            .set_cache_control(input.cache_control)
            .set_content_disposition(input.content_disposition)
            .set_content_encoding(input.content_encoding)
            .set_content_language(input.content_language)
            .set_content_type(input.content_type)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, &input.key))?;
        Ok(PutObjectOutput {
            e_tag: output.e_tag().map(ToOwned::to_owned),
        })
    }

    async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StoreError> {
        debug!(bucket = %input.bucket, key = %input.key, "DeleteObject");
        self.client
            .delete_object()
            .bucket(&input.bucket)
            .key(&input.key)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, &input.key))?;
        Ok(())
    }

    async fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, StoreError> {
        debug!(bucket = %input.bucket, prefix = ?input.prefix, "ListObjectsV2");
        let resource = input.prefix.clone().unwrap_or_default();
        let output = self
            .client
            .list_objects_v2()
            .bucket(&input.bucket)
            .set_prefix(input.prefix)
            .set_delimiter(input.delimiter)
            .set_continuation_token(input.continuation_token)
            .set_max_keys(input.max_keys)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, &resource))?;
        Ok(convert_list_output(&output))
    }
}
