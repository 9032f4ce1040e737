//! Directory listings.
//!
//! A directory GET with browsing enabled lists one page of the store under
//! the directory's prefix, using `/` as delimiter. Query parameters `next`
//! (continuation token) and `max` (page size, `1..=1000`) drive pagination.
//! The page renders as JSON or through a [`ListingTemplate`], either the
//! built-in page or a [`FileListingTemplate`] loaded at startup.

mod file;
mod humanize;
mod pool;
mod render;

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use s3proxy_model::{ListObjectsV2Input, ListObjectsV2Output};

use crate::config::{MAX_LISTING_KEYS, ProxyConfig};
use crate::path::ResolvedKey;

pub use file::FileListingTemplate;
pub use humanize::{bytes as humanize_bytes, relative_time};
pub use pool::{BufferPool, PooledBuffer};
pub use render::{
    DefaultListingTemplate, ListingError, ListingFormat, ListingRenderer, ListingTemplate,
    RenderedListing,
};

/// Characters escaped in entry links: everything except unreserved characters.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the store listing request for a directory key.
///
/// `query` is the raw request query string, without the leading `?`.
#[must_use]
pub fn build_list_input(config: &ProxyConfig, key: &ResolvedKey, query: Option<&str>) -> ListObjectsV2Input {
    let mut continuation_token = None;
    let mut max_keys = None;
    for (name, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match name.as_ref() {
            "next" if !value.is_empty() => continuation_token = Some(value.into_owned()),
            "max" => max_keys = parse_max_keys(&value),
            _ => {}
        }
    }

    ListObjectsV2Input {
        bucket: config.bucket.clone(),
        prefix: Some(key.store_key().to_owned()),
        delimiter: Some("/".to_owned()),
        continuation_token,
        max_keys: max_keys.or(config.listing_max_keys),
    }
}

fn parse_max_keys(value: &str) -> Option<i32> {
    value
        .parse::<i32>()
        .ok()
        .filter(|max| *max > 0 && *max <= MAX_LISTING_KEYS)
}

/// One entry on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingItem {
    /// Last path segment.
    pub name: String,
    /// Whether the entry is a common prefix.
    pub is_dir: bool,
    /// Full store key; empty for directories.
    pub key: String,
    /// Link relative to the listed directory, percent-encoded.
    pub url: String,
    /// Human-readable size; empty for directories.
    pub size: String,
    /// Human-readable age; empty for directories.
    pub last_modified: String,
}

/// One page of a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingPage {
    /// Continuation token of the next page, or empty.
    pub next_token: String,
    /// Number of entries the store reported for this page.
    pub count: i64,
    /// Directories first, then objects, in store order.
    pub items: Vec<ListingItem>,
    /// Query string linking to the next page, or empty.
    pub more: String,
}

impl ListingPage {
    /// Convert a store listing into a page, describing ages relative to `now`.
    #[must_use]
    pub fn from_output(output: &ListObjectsV2Output, now: DateTime<Utc>) -> Self {
        let mut items = Vec::with_capacity(output.common_prefixes.len() + output.contents.len());

        for prefix in &output.common_prefixes {
            let name = base_name(prefix).to_owned();
            items.push(ListingItem {
                url: format!("./{}/", utf8_percent_encode(&name, SEGMENT_ENCODE_SET)),
                name,
                is_dir: true,
                key: String::new(),
                size: String::new(),
                last_modified: String::new(),
            });
        }

        for object in &output.contents {
            let name = base_name(&object.key).to_owned();
            items.push(ListingItem {
                url: format!("./{}", utf8_percent_encode(&name, SEGMENT_ENCODE_SET)),
                name,
                is_dir: false,
                key: object.key.clone(),
                size: humanize::bytes(u64::try_from(object.size).unwrap_or_default()),
                last_modified: object
                    .last_modified
                    .map(|t| humanize::relative_time(t, now))
                    .unwrap_or_default(),
            });
        }

        let next_token = output.next_continuation_token.clone().unwrap_or_default();
        let more = if next_token.is_empty() {
            String::new()
        } else {
            let mut query = form_urlencoded::Serializer::new(String::new());
            if let Some(max) = output.max_keys {
                query.append_pair("max", &max.to_string());
            }
            query.append_pair("next", &next_token);
            format!("?{}", query.finish())
        };

        let count = output
            .key_count
            .map_or_else(|| i64::try_from(items.len()).unwrap_or(i64::MAX), i64::from);

        Self {
            next_token,
            count,
            items,
            more,
        }
    }
}

/// Last non-empty segment of a key, ignoring trailing separators.
fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use s3proxy_model::Object;

    use super::*;

    fn config() -> ProxyConfig {
        ProxyConfig::builder().bucket("myBucket".to_owned()).build()
    }

    #[test]
    fn test_should_build_input_without_query() {
        let input = build_list_input(&config(), &ResolvedKey::new("/mypath/"), None);
        assert_eq!(
            input,
            ListObjectsV2Input {
                bucket: "myBucket".to_owned(),
                prefix: Some("mypath/".to_owned()),
                delimiter: Some("/".to_owned()),
                continuation_token: None,
                max_keys: None,
            }
        );
    }

    #[test]
    fn test_should_percent_encode_entry_links() {
        let output = ListObjectsV2Output {
            common_prefixes: vec!["docs/a b#1/".to_owned()],
            contents: vec![Object {
                key: "docs/what?.txt".to_owned(),
                size: 1,
                ..Default::default()
            }],
            ..Default::default()
        };
        let page = ListingPage::from_output(&output, Utc::now());
        assert_eq!(page.items[0].name, "a b#1");
        assert_eq!(page.items[0].url, "./a%20b%231/");
        assert_eq!(page.items[1].name, "what?.txt");
        assert_eq!(page.items[1].url, "./what%3F.txt");
    }

    #[test]
    fn test_should_build_input_with_max_and_next() {
        let input = build_list_input(&config(), &ResolvedKey::new("/mypath/"), Some("max=20&next=FOO"));
        assert_eq!(input.max_keys, Some(20));
        assert_eq!(input.continuation_token.as_deref(), Some("FOO"));
    }

    #[test]
    fn test_should_ignore_out_of_range_max() {
        for query in ["max=0", "max=-3", "max=1001", "max=lots"] {
            let input = build_list_input(&config(), &ResolvedKey::new("/mypath/"), Some(query));
            assert_eq!(input.max_keys, None, "query {query}");
        }
        let input = build_list_input(&config(), &ResolvedKey::new("/mypath/"), Some("max=1000"));
        assert_eq!(input.max_keys, Some(1000));
    }

    #[test]
    fn test_should_fall_back_to_configured_page_size() {
        let config = ProxyConfig::builder()
            .bucket("myBucket".to_owned())
            .listing_max_keys(Some(50))
            .build();
        let input = build_list_input(&config, &ResolvedKey::new("/"), Some("max=abc"));
        assert_eq!(input.max_keys, Some(50));
        assert_eq!(input.prefix.as_deref(), Some(""));
    }

    #[test]
    fn test_should_make_page_from_listing() {
        let output = ListObjectsV2Output {
            key_count: Some(20),
            next_continuation_token: Some("next_token".to_owned()),
            max_keys: Some(20),
            common_prefixes: vec!["/mydir".to_owned(), "/otherdir/".to_owned()],
            contents: vec![Object {
                key: "/path/to/myobj".to_owned(),
                size: 1024,
                last_modified: Utc.with_ymd_and_hms(1845, 11, 10, 23, 0, 0).single(),
                e_tag: None,
            }],
            is_truncated: true,
        };

        let page = ListingPage::from_output(&output, Utc::now());
        assert_eq!(page.count, 20);
        assert_eq!(page.more, "?max=20&next=next_token");
        assert_eq!(page.next_token, "next_token");
        assert_eq!(
            page.items,
            vec![
                ListingItem {
                    name: "mydir".to_owned(),
                    is_dir: true,
                    key: String::new(),
                    url: "./mydir/".to_owned(),
                    size: String::new(),
                    last_modified: String::new(),
                },
                ListingItem {
                    name: "otherdir".to_owned(),
                    is_dir: true,
                    key: String::new(),
                    url: "./otherdir/".to_owned(),
                    size: String::new(),
                    last_modified: String::new(),
                },
                ListingItem {
                    name: "myobj".to_owned(),
                    is_dir: false,
                    key: "/path/to/myobj".to_owned(),
                    url: "./myobj".to_owned(),
                    size: "1.0 kB".to_owned(),
                    last_modified: "a long while ago".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_should_omit_more_link_on_last_page() {
        let output = ListObjectsV2Output {
            contents: vec![Object {
                key: "a.txt".to_owned(),
                size: 3,
                ..Object::default()
            }],
            ..ListObjectsV2Output::default()
        };
        let page = ListingPage::from_output(&output, Utc::now());
        assert!(page.more.is_empty());
        assert!(page.next_token.is_empty());
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].size, "3 B");
    }

    #[test]
    fn test_should_encode_tokens_in_more_link() {
        let output = ListObjectsV2Output {
            next_continuation_token: Some("a+b/c==".to_owned()),
            ..ListObjectsV2Output::default()
        };
        let page = ListingPage::from_output(&output, Utc::now());
        assert_eq!(page.more, "?next=a%2Bb%2Fc%3D%3D");
    }
}
