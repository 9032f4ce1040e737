//! Conditional and range request parameters.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use http::header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE, RANGE};
use s3proxy_model::GetObjectInput;

/// Conditional and range parameters forwarded to a store retrieval.
///
/// Timestamps that do not parse as HTTP dates are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalParams {
    /// Raw `Range` header.
    pub range: Option<String>,
    /// Raw `If-Match` header.
    pub if_match: Option<String>,
    /// Raw `If-None-Match` header.
    pub if_none_match: Option<String>,
    /// Parsed `If-Modified-Since` header.
    pub if_modified_since: Option<DateTime<Utc>>,
    /// Parsed `If-Unmodified-Since` header.
    pub if_unmodified_since: Option<DateTime<Utc>>,
}

impl ConditionalParams {
    /// Extract the parameters from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            range: header_string(headers, &RANGE),
            if_match: header_string(headers, &IF_MATCH),
            if_none_match: header_string(headers, &IF_NONE_MATCH),
            if_modified_since: header_date(headers, &IF_MODIFIED_SINCE),
            if_unmodified_since: header_date(headers, &IF_UNMODIFIED_SINCE),
        }
    }

    /// Whether no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build a retrieval input for `key` carrying these parameters.
    #[must_use]
    pub fn to_get_input(&self, bucket: &str, key: &str) -> GetObjectInput {
        GetObjectInput {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            range: self.range.clone(),
            if_match: self.if_match.clone(),
            if_none_match: self.if_none_match.clone(),
            if_modified_since: self.if_modified_since,
            if_unmodified_since: self.if_unmodified_since,
        }
    }
}

fn header_string(headers: &HeaderMap, name: &http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn header_date(headers: &HeaderMap, name: &http::HeaderName) -> Option<DateTime<Utc>> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use http::HeaderValue;

    use super::*;

    #[test]
    fn test_should_pass_through_range_and_etags() {
        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=0-4"));
        headers.insert(IF_MATCH, HeaderValue::from_static("\"abc\""));
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"def\""));

        let params = ConditionalParams::from_headers(&headers);
        assert_eq!(params.range.as_deref(), Some("bytes=0-4"));
        assert_eq!(params.if_match.as_deref(), Some("\"abc\""));
        assert_eq!(params.if_none_match.as_deref(), Some("\"def\""));
        assert!(params.if_modified_since.is_none());
    }

    #[test]
    fn test_should_parse_http_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"),
        );
        headers.insert(
            IF_UNMODIFIED_SINCE,
            HeaderValue::from_static("Sunday, 06-Nov-94 08:49:37 GMT"),
        );

        let params = ConditionalParams::from_headers(&headers);
        let expected = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).single();
        assert_eq!(params.if_modified_since, expected);
        assert_eq!(params.if_unmodified_since, expected);
    }

    #[test]
    fn test_should_omit_malformed_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_MODIFIED_SINCE, HeaderValue::from_static("yesterday"));
        headers.insert(IF_UNMODIFIED_SINCE, HeaderValue::from_static(""));

        let params = ConditionalParams::from_headers(&headers);
        assert!(params.if_modified_since.is_none());
        assert!(params.if_unmodified_since.is_none());
        assert!(params.is_empty());
    }

    #[test]
    fn test_should_build_get_input() {
        let params = ConditionalParams {
            if_none_match: Some("\"abc\"".to_owned()),
            ..ConditionalParams::default()
        };
        let input = params.to_get_input("assets", "a/b.txt");
        assert_eq!(input.bucket, "assets");
        assert_eq!(input.key, "a/b.txt");
        assert_eq!(input.if_none_match.as_deref(), Some("\"abc\""));
        assert!(input.range.is_none());
    }
}
