//! Helpers shared by the in-memory store: ranges, ETags, continuation tokens.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use md5::{Digest, Md5};

// ---------------------------------------------------------------------------
// Range header parsing
// ---------------------------------------------------------------------------

/// How a `Range` header applies to an object of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// The header is not a single well-formed `bytes=` range; serve the whole object.
    Ignored,
    /// An inclusive range within the object.
    Satisfiable(u64, u64),
    /// A well-formed range that selects no bytes of the object.
    Unsatisfiable,
}

/// Parse an HTTP `Range` header value against an object length.
///
/// Supported formats:
/// - `bytes=0-499` -- first 500 bytes
/// - `bytes=-500` -- last 500 bytes
/// - `bytes=500-` -- from byte 500 to the end
///
/// Malformed values, other units and multi-range requests are ignored, as
/// S3 does.
///
/// # Examples
///
/// ```
/// use s3proxy_core::utils::{ByteRange, parse_range_header};
///
/// assert_eq!(parse_range_header("bytes=0-499", 1000), ByteRange::Satisfiable(0, 499));
/// assert_eq!(parse_range_header("bytes=2000-", 1000), ByteRange::Unsatisfiable);
/// assert_eq!(parse_range_header("bytes=abc", 1000), ByteRange::Ignored);
/// ```
#[must_use]
pub fn parse_range_header(range: &str, content_length: u64) -> ByteRange {
    let Some(spec) = range.trim().strip_prefix("bytes=") else {
        return ByteRange::Ignored;
    };
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Ignored;
    };
    let (Ok(first), Ok(last)) = (parse_bound(first), parse_bound(last)) else {
        return ByteRange::Ignored;
    };

    match (first, last) {
        (None, None) => ByteRange::Ignored,
        (None, Some(0)) => ByteRange::Unsatisfiable,
        (None, Some(suffix)) if content_length > 0 => {
            ByteRange::Satisfiable(content_length.saturating_sub(suffix), content_length - 1)
        }
        (Some(start), Some(end)) if start > end => ByteRange::Ignored,
        (Some(start), end) if start < content_length => {
            let end = end.map_or(content_length - 1, |e| e.min(content_length - 1));
            ByteRange::Satisfiable(start, end)
        }
        _ => ByteRange::Unsatisfiable,
    }
}

fn parse_bound(value: &str) -> Result<Option<u64>, std::num::ParseIntError> {
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

// ---------------------------------------------------------------------------
// ETags
// ---------------------------------------------------------------------------

/// Compute the quoted MD5 entity tag of an object body.
#[must_use]
pub fn compute_etag(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(data)))
}

/// Check whether the given ETag satisfies an `If-Match` condition.
///
/// # Examples
///
/// ```
/// use s3proxy_core::utils::is_valid_if_match;
///
/// assert!(is_valid_if_match("\"abc\"", "*"));
/// assert!(is_valid_if_match("\"abc\"", "\"xyz\", \"abc\""));
/// assert!(!is_valid_if_match("\"abc\"", "\"xyz\""));
/// ```
#[must_use]
pub fn is_valid_if_match(etag: &str, if_match: &str) -> bool {
    etag_list_contains(etag, if_match)
}

/// Check whether the given ETag satisfies an `If-None-Match` condition.
///
/// Returns `false` when the ETag matches, meaning a 304 is appropriate.
#[must_use]
pub fn is_valid_if_none_match(etag: &str, if_none_match: &str) -> bool {
    !etag_list_contains(etag, if_none_match)
}

fn etag_list_contains(etag: &str, list: &str) -> bool {
    let etag = normalize_etag(etag);
    list.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || normalize_etag(candidate.strip_prefix("W/").unwrap_or(candidate)) == etag
    })
}

/// Normalize an ETag by stripping surrounding double quotes.
fn normalize_etag(etag: &str) -> &str {
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}

// ---------------------------------------------------------------------------
// Continuation tokens
// ---------------------------------------------------------------------------

/// Encode a listing position as an opaque continuation token.
#[must_use]
pub fn encode_continuation_token(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

/// Decode a continuation token back to a listing position.
///
/// Returns `None` if the token is not valid base64 or not UTF-8.
#[must_use]
pub fn decode_continuation_token(token: &str) -> Option<String> {
    let bytes = BASE64_STANDARD.decode(token).ok()?;
    String::from_utf8(bytes).ok()
}
