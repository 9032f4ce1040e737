//! The object store seam.
//!
//! [`ObjectStore`] is the only way the proxy talks to storage. Implementations
//! must be safe to share across concurrent requests; the proxy holds one
//! behind an `Arc` for its whole lifetime.

use std::fmt;

use async_trait::async_trait;
use s3proxy_model::{
    DeleteObjectInput, GetObjectInput, GetObjectOutput, ListObjectsV2Input, ListObjectsV2Output,
    PutObjectInput, PutObjectOutput, StoreError,
};

/// A bucket/key object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug + 'static {
    /// Retrieve one object, honouring the conditional and range parameters.
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, StoreError>;

    /// Store one object.
    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, StoreError>;

    /// Delete one object. Deleting a missing key succeeds.
    async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StoreError>;

    /// List one page of keys under a prefix.
    async fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, StoreError>;
}
