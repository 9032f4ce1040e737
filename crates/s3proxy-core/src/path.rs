//! Request path to store key resolution.
//!
//! A request path is joined with the configured root, cleaned of redundant
//! separators and `..` segments, and keeps its trailing `/` when it names a
//! directory. The result is a [`ResolvedKey`].

use std::fmt;

use percent_encoding::percent_decode_str;
use tracing::debug;

/// A store key resolved from a request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedKey {
    path: String,
    is_directory: bool,
}

impl ResolvedKey {
    /// Wrap an already-joined path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let is_directory = path.ends_with('/');
        Self { path, is_directory }
    }

    /// Resolve a raw request path against the root, after root template expansion.
    #[must_use]
    pub fn resolve(root: &str, request_path: &str) -> Self {
        let decoded = percent_decode_str(request_path).decode_utf8_lossy();
        Self::new(join_path(root, &decoded))
    }

    /// The joined path, with its leading `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The key sent to the store: the joined path without its leading `/`.
    #[must_use]
    pub fn store_key(&self) -> &str {
        store_key(&self.path)
    }

    /// Whether the path names a directory (ends with `/`).
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// The key of `name` inside this directory.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self::new(clean(&format!("{}/{name}", self.path)))
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Strip the leading `/` from a path to obtain a store key.
#[must_use]
pub fn store_key(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Join a root and a request path.
///
/// Redundant separators and `.`/`..` segments are removed, and `..` never
/// escapes the root. A trailing `/` on
/// the request path (or, when the request path is empty, on the root) is
/// kept unless the result is exactly `/`.
///
/// # Examples
///
/// ```
/// use s3proxy_core::path::join_path;
///
/// assert_eq!(join_path("/cat/", "/dog/"), "/cat/dog/");
/// assert_eq!(join_path("", "/"), "/");
/// assert_eq!(join_path("/site", "/a/../b"), "/site/b");
/// ```
#[must_use]
pub fn join_path(root: &str, request_path: &str) -> String {
    let is_dir = if request_path.is_empty() {
        root.ends_with('/')
    } else {
        request_path.ends_with('/')
    };

    let joined = match (root.is_empty(), request_path.is_empty()) {
        (true, true) => return String::new(),
        (true, false) => clean(request_path),
        (false, true) => clean(root),
        // The request path is anchored first so `..` can never climb above the root.
        (false, false) => clean(&format!("{root}/{}", clean(&format!("/{request_path}")))),
    };

    if is_dir && joined != "/" {
        format!("{joined}/")
    } else {
        joined
    }
}

/// Lexically clean a slash-separated path.
///
/// Empty and `.` segments are dropped, `..` removes the preceding segment
/// (and is dropped at the root of an absolute path). An empty result is `.`
/// for relative paths and `/` for absolute ones.
#[must_use]
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_owned();
    }
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }
    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

/// Expand placeholders in a root template.
///
/// `{host}` and `{http.request.host}` become the request host without its
/// port; any other placeholder expands to the empty string. A host that is
/// not a plain DNS name or IP literal (for example one containing `/` or
/// equal to `..`) expands to the empty string, so it can never move the
/// root. An unterminated `{` is kept literally.
///
/// # Examples
///
/// ```
/// use s3proxy_core::path::expand_root;
///
/// assert_eq!(expand_root("/sites/{host}", Some("example.com:8080")), "/sites/example.com");
/// assert_eq!(expand_root("/{unknown}/x", None), "//x");
/// assert_eq!(expand_root("/sites/{host}", Some("../secret")), "/sites/");
/// ```
#[must_use]
pub fn expand_root(template: &str, host: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        match &after[..end] {
            "host" | "http.request.host" => {
                out.push_str(host.and_then(root_safe_host).unwrap_or_default());
            }
            _ => {}
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// The host without its port, if it is safe to use as a path segment.
fn root_safe_host(host: &str) -> Option<&str> {
    let host = strip_port(host);
    let valid = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(ip) => !ip.is_empty() && ip.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.'),
        None => {
            !host.is_empty()
                && host != "."
                && host != ".."
                && host
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        }
    };
    if !valid {
        debug!(host, "ignoring host unusable in root template");
    }
    valid.then_some(host)
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep the bracketed address.
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}
