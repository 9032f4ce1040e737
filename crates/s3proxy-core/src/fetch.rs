//! Object retrieval with index-file probing.

use std::sync::Arc;

use s3proxy_model::{GetObjectInput, GetObjectOutput};
use tracing::{debug, warn};

use crate::classify;
use crate::conditional::ConditionalParams;
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::path::{ResolvedKey, store_key};
use crate::store::ObjectStore;

/// What a GET resolved to.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A concrete object, possibly an index file found under a directory.
    Object(Box<GetObjectOutput>),
    /// A directory for which no index file exists.
    Directory,
}

/// Retrieves objects from the store on behalf of GET requests.
#[derive(Debug, Clone)]
pub struct ObjectFetcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    index_names: Vec<String>,
}

impl ObjectFetcher {
    /// Create a fetcher for the configured bucket and index names.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: &ProxyConfig) -> Self {
        Self {
            store,
            bucket: config.bucket.clone(),
            index_names: config.index_names.clone(),
        }
    }

    /// Fetch `key`.
    ///
    /// A directory key is probed for each index name in order and the first
    /// hit is returned as a plain object. Probe failures other than the
    /// conditional outcomes (304/412/416) are logged and the next name is
    /// tried; when none match the result is [`FetchOutcome::Directory`].
    pub async fn fetch(
        &self,
        key: &ResolvedKey,
        params: &ConditionalParams,
    ) -> Result<FetchOutcome, ProxyError> {
        if !key.is_directory() {
            let output = self.get(params.to_get_input(&self.bucket, key.store_key())).await?;
            return Ok(FetchOutcome::Object(Box::new(output)));
        }

        for name in &self.index_names {
            let candidate = key.child(name);
            let input = params.to_get_input(&self.bucket, candidate.store_key());
            match self.store.get_object(input).await {
                Ok(output) => {
                    debug!(bucket = %self.bucket, key = %candidate, "found index");
                    return Ok(FetchOutcome::Object(Box::new(output)));
                }
                Err(err) if classify::is_not_found(&err.code) => {
                    debug!(bucket = %self.bucket, key = %candidate, "no index");
                }
                Err(err) if classify::is_negotiation_status(classify::status_for(&err.code)) => {
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(
                        bucket = %self.bucket,
                        key = %candidate,
                        error = %err,
                        "error when looking for index"
                    );
                }
            }
        }

        Ok(FetchOutcome::Directory)
    }

    /// Fetch a configured key with no conditional parameters.
    pub async fn fetch_unconditional(&self, key: &str) -> Result<GetObjectOutput, ProxyError> {
        self.get(GetObjectInput {
            bucket: self.bucket.clone(),
            key: store_key(key).to_owned(),
            ..GetObjectInput::default()
        })
        .await
    }

    async fn get(&self, input: GetObjectInput) -> Result<GetObjectOutput, ProxyError> {
        debug!(bucket = %input.bucket, key = %input.key, "get from store");
        Ok(self.store.get_object(input).await?)
    }

    /// The bucket this fetcher reads from.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The shared store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}
