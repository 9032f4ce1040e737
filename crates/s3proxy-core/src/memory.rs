//! In-memory object store.
//!
//! Keeps buckets as sorted key maps behind a single `RwLock`. It honours the
//! same conditional, range and listing semantics as S3, which makes it
//! suitable both as a development backend and as the store behind the
//! proxy's own tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;
use typed_builder::TypedBuilder;

use s3proxy_model::{
    DeleteObjectInput, GetObjectInput, GetObjectOutput, ListObjectsV2Input, ListObjectsV2Output,
    Object, PutObjectInput, PutObjectOutput, StoreError, StreamingBlob, store_error,
};

use crate::store::ObjectStore;
use crate::utils::{
    ByteRange, compute_etag, decode_continuation_token, encode_continuation_token,
    is_valid_if_match, is_valid_if_none_match, parse_range_header,
};

/// Page size applied when a listing does not ask for one.
const DEFAULT_MAX_KEYS: i32 = 1000;

/// An object as seeded into or held by the in-memory store.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MemoryObject {
    /// Object content.
    #[builder(setter(into))]
    pub data: Bytes,
    /// `Content-Type`.
    #[builder(default, setter(strip_option, into))]
    pub content_type: Option<String>,
    /// `Cache-Control`.
    #[builder(default, setter(strip_option, into))]
    pub cache_control: Option<String>,
    /// `Content-Disposition`.
    #[builder(default, setter(strip_option, into))]
    pub content_disposition: Option<String>,
    /// `Content-Encoding`.
    #[builder(default, setter(strip_option, into))]
    pub content_encoding: Option<String>,
    /// `Content-Language`.
    #[builder(default, setter(strip_option, into))]
    pub content_language: Option<String>,
    /// `Expires`, verbatim.
    #[builder(default, setter(strip_option, into))]
    pub expires: Option<String>,
    /// User-defined metadata.
    #[builder(default)]
    pub metadata: BTreeMap<String, String>,
    /// Last modification time.
    #[builder(default = Utc::now())]
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    object: MemoryObject,
    e_tag: String,
}

impl From<MemoryObject> for StoredObject {
    fn from(object: MemoryObject) -> Self {
        let e_tag = compute_etag(&object.data);
        Self { object, e_tag }
    }
}

type Bucket = BTreeMap<String, StoredObject>;

/// A process-local object store.
///
/// # Examples
///
/// ```
/// use s3proxy_core::{InMemoryObjectStore, MemoryObject, ObjectStore};
/// use s3proxy_model::GetObjectInput;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryObjectStore::new().with_bucket("site");
/// store
///     .insert("site", "hello.txt", MemoryObject::builder().data("hello").build())
///     .unwrap();
///
/// let output = store
///     .get_object(GetObjectInput {
///         bucket: "site".into(),
///         key: "hello.txt".into(),
///         ..Default::default()
///     })
///     .await
///     .unwrap();
/// assert_eq!(output.content_length, Some(5));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl InMemoryObjectStore {
    /// Create an empty store with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the bucket, returning the store.
    #[must_use]
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.create_bucket(bucket);
        self
    }

    /// Create the bucket if it does not exist.
    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.buckets.write().entry(bucket.into()).or_default();
    }

    /// Store an object directly, returning its ETag.
    pub fn insert(
        &self,
        bucket: &str,
        key: impl Into<String>,
        object: MemoryObject,
    ) -> Result<String, StoreError> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::no_such_bucket(bucket))?;
        let stored = StoredObject::from(object);
        let e_tag = stored.e_tag.clone();
        objects.insert(key.into(), stored);
        Ok(e_tag)
    }

    fn lookup(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::no_such_bucket(bucket))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::no_such_key(key))
    }
}

/// Evaluate preconditions in the order S3 applies them.
fn check_preconditions(stored: &StoredObject, input: &GetObjectInput) -> Result<(), StoreError> {
    let modified_secs = stored.object.last_modified.timestamp();

    if let Some(if_match) = &input.if_match {
        if !is_valid_if_match(&stored.e_tag, if_match) {
            return Err(StoreError::precondition_failed("If-Match"));
        }
    } else if let Some(since) = input.if_unmodified_since {
        if modified_secs > since.timestamp() {
            return Err(StoreError::precondition_failed("If-Unmodified-Since"));
        }
    }

    if let Some(if_none_match) = &input.if_none_match {
        if !is_valid_if_none_match(&stored.e_tag, if_none_match) {
            return Err(StoreError::not_modified(&input.key));
        }
    } else if let Some(since) = input.if_modified_since {
        if modified_secs <= since.timestamp() {
            return Err(StoreError::not_modified(&input.key));
        }
    }

    Ok(())
}

/// An entry on a listing page: an object or a rolled-up prefix.
enum ListEntry<'a> {
    Object(&'a str, &'a StoredObject),
    Prefix(String),
}

impl ListEntry<'_> {
    fn marker(&self) -> &str {
        match self {
            Self::Object(key, _) => key,
            Self::Prefix(prefix) => prefix,
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, StoreError> {
        let stored = self.lookup(&input.bucket, &input.key)?;
        check_preconditions(&stored, &input)?;

        let data = stored.object.data.clone();
        let total = data.len() as u64;
        let range = input
            .range
            .as_deref()
            .map_or(ByteRange::Ignored, |range| parse_range_header(range, total));
        let (body, content_range) = match range {
            ByteRange::Ignored => (data, None),
            ByteRange::Satisfiable(start, end) => {
                let invalid = || StoreError::invalid_range(input.range.clone().unwrap_or_default());
                let from = usize::try_from(start).map_err(|_| invalid())?;
                let to = usize::try_from(end).map_err(|_| invalid())?;
                (
                    data.slice(from..=to),
                    Some(format!("bytes {start}-{end}/{total}")),
                )
            }
            ByteRange::Unsatisfiable => {
                return Err(StoreError::invalid_range(input.range.unwrap_or_default()));
            }
        };

        debug!(bucket = %input.bucket, key = %input.key, len = body.len(), "served object from memory");

        let object = stored.object;
        Ok(GetObjectOutput {
            content_length: i64::try_from(body.len()).ok(),
            body: StreamingBlob::from_bytes(body),
            cache_control: object.cache_control,
            content_disposition: object.content_disposition,
            content_encoding: object.content_encoding,
            content_language: object.content_language,
            content_range,
            content_type: object.content_type,
            e_tag: Some(stored.e_tag),
            expires: object.expires,
            last_modified: Some(object.last_modified),
            metadata: object.metadata,
        })
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, StoreError> {
        let object = MemoryObject {
            data: input.body,
            content_type: input.content_type,
            cache_control: input.cache_control,
            content_disposition: input.content_disposition,
            content_encoding: input.content_encoding,
            content_language: input.content_language,
            expires: None,
            metadata: BTreeMap::new(),
            last_modified: Utc::now(),
        };
        let e_tag = self.insert(&input.bucket, input.key, object)?;
        Ok(PutObjectOutput { e_tag: Some(e_tag) })
    }

    async fn delete_object(&self, input: DeleteObjectInput) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(&input.bucket)
            .ok_or_else(|| StoreError::no_such_bucket(&input.bucket))?;
        objects.remove(&input.key);
        Ok(())
    }

    async fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, StoreError> {
        let prefix = input.prefix.unwrap_or_default();
        let delimiter = input.delimiter.unwrap_or_default();
        let max_keys = input
            .max_keys
            .unwrap_or(DEFAULT_MAX_KEYS)
            .clamp(0, DEFAULT_MAX_KEYS);
        let limit = usize::try_from(max_keys).unwrap_or_default();
        let start_after = match input.continuation_token.as_deref() {
            Some(token) => Some(decode_continuation_token(token).ok_or_else(|| {
                store_error!(InvalidArgument, "The continuation token provided is incorrect")
            })?),
            None => None,
        };

        let buckets = self.buckets.read();
        let objects = buckets
            .get(&input.bucket)
            .ok_or_else(|| StoreError::no_such_bucket(&input.bucket))?;

        let mut page: Vec<ListEntry<'_>> = Vec::new();
        let mut is_truncated = false;

        for (key, stored) in objects.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            if let Some(marker) = start_after.as_deref() {
                // A prefix marker covers every key rolled up under it.
                if key.as_str() <= marker
                    || (!delimiter.is_empty() && marker.ends_with(&delimiter) && key.starts_with(marker))
                {
                    continue;
                }
            }

            let rest = &key[prefix.len()..];
            let entry = match rest.find(&delimiter).filter(|_| !delimiter.is_empty()) {
                Some(pos) => ListEntry::Prefix(format!("{prefix}{}", &rest[..pos + delimiter.len()])),
                None => ListEntry::Object(key, stored),
            };

            if let (ListEntry::Prefix(cp), Some(ListEntry::Prefix(last))) = (&entry, page.last()) {
                if cp == last {
                    continue;
                }
            }

            if page.len() >= limit {
                is_truncated = true;
                break;
            }
            page.push(entry);
        }

        let next_continuation_token = if is_truncated {
            page.last().map(|entry| encode_continuation_token(entry.marker()))
        } else {
            None
        };

        let mut output = ListObjectsV2Output {
            key_count: i32::try_from(page.len()).ok(),
            max_keys: Some(max_keys),
            next_continuation_token,
            is_truncated,
            ..ListObjectsV2Output::default()
        };
        for entry in page {
            match entry {
                ListEntry::Prefix(cp) => output.common_prefixes.push(cp),
                ListEntry::Object(key, stored) => output.contents.push(Object {
                    key: key.to_owned(),
                    size: i64::try_from(stored.object.data.len()).unwrap_or(i64::MAX),
                    last_modified: Some(stored.object.last_modified),
                    e_tag: Some(stored.e_tag.clone()),
                }),
            }
        }
        Ok(output)
    }
}
