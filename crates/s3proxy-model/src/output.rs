//! Object store operation outputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::body::StreamingBlob;

/// A retrieved object: its store-reported headers and a body stream.
#[derive(Debug, Default)]
pub struct GetObjectOutput {
    /// The object content.
    pub body: StreamingBlob,
    /// Stored `Cache-Control`.
    pub cache_control: Option<String>,
    /// Stored `Content-Disposition`.
    pub content_disposition: Option<String>,
    /// Stored `Content-Encoding`.
    pub content_encoding: Option<String>,
    /// Stored `Content-Language`.
    pub content_language: Option<String>,
    /// Length of the returned body in bytes.
    pub content_length: Option<i64>,
    /// `Content-Range` for partial responses.
    pub content_range: Option<String>,
    /// Stored `Content-Type`.
    pub content_type: Option<String>,
    /// Entity tag, quoted.
    pub e_tag: Option<String>,
    /// Stored `Expires`, verbatim.
    pub expires: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// User-defined metadata.
    pub metadata: BTreeMap<String, String>,
}

/// Result of an object upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Entity tag of the stored object, quoted.
    pub e_tag: Option<String>,
}

/// An object entry in a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: i64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag, quoted.
    pub e_tag: Option<String>,
}

/// One page of a delimiter-aware listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsV2Output {
    /// Rolled-up key prefixes, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
    /// Objects directly under the requested prefix.
    pub contents: Vec<Object>,
    /// Number of entries (objects plus common prefixes) on this page.
    pub key_count: Option<i32>,
    /// Page size the store applied.
    pub max_keys: Option<i32>,
    /// Token for the next page; set only when the listing is truncated.
    pub next_continuation_token: Option<String>,
    /// Whether more entries remain.
    pub is_truncated: bool,
}
