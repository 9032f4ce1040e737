//! Object store operation inputs.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Input for a single-object retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetObjectInput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Raw `Range` header value, e.g. `bytes=0-99`.
    pub range: Option<String>,
    /// Return the object only if its ETag matches.
    pub if_match: Option<String>,
    /// Return the object only if its ETag differs.
    pub if_none_match: Option<String>,
    /// Return the object only if modified after this instant.
    pub if_modified_since: Option<DateTime<Utc>>,
    /// Return the object only if not modified after this instant.
    pub if_unmodified_since: Option<DateTime<Utc>>,
}

/// Input for an object upload.
#[derive(Debug, Clone, Default)]
pub struct PutObjectInput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// The complete object content.
    pub body: Bytes,
    /// `Cache-Control` to store with the object.
    pub cache_control: Option<String>,
    /// `Content-Disposition` to store with the object.
    pub content_disposition: Option<String>,
    /// `Content-Encoding` to store with the object.
    pub content_encoding: Option<String>,
    /// `Content-Language` to store with the object.
    pub content_language: Option<String>,
    /// `Content-Type` to store with the object.
    pub content_type: Option<String>,
}

/// Input for an object deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectInput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
}

/// Input for a delimiter-aware, paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsV2Input {
    /// Bucket name.
    pub bucket: String,
    /// Only keys starting with this prefix are returned.
    pub prefix: Option<String>,
    /// Keys containing the delimiter after the prefix are rolled up into common prefixes.
    pub delimiter: Option<String>,
    /// Opaque token returned by a previous page.
    pub continuation_token: Option<String>,
    /// Maximum number of entries to return; the store default applies when unset.
    pub max_keys: Option<i32>,
}
