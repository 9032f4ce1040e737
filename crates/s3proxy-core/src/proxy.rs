//! Request orchestration.
//!
//! [`S3Proxy::handle`] resolves the request path to a store key, routes by
//! method, and turns the outcome into a [`ProxyResponse`]. Failed GETs go
//! through the error page resolver, which may serve a fallback object or
//! hand the request to the [`Next`] handler.

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, EXPIRES, HOST, LAST_MODIFIED,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use s3proxy_model::{DeleteObjectInput, GetObjectOutput, PutObjectInput, StreamingBlob};
use tracing::{debug, error, warn};

use crate::conditional::ConditionalParams;
use crate::config::ProxyConfig;
use crate::dispatch::{self, Operation};
use crate::error::ProxyError;
use crate::error_page::{ErrorAction, ErrorPageResolver};
use crate::fetch::{FetchOutcome, ObjectFetcher};
use crate::hidden::HiddenMatcher;
use crate::listing::{self, ListingFormat, ListingPage, ListingRenderer, ListingTemplate};
use crate::path::{ResolvedKey, expand_root};
use crate::store::ObjectStore;

/// An incoming request, with the body already buffered.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Request method.
    pub method: Method,
    /// Request target.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body; only PUT uses it.
    pub body: Bytes,
}

impl ProxyRequest {
    /// Create a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The request host, from the `Host` header or the URI authority.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.authority().map(http::uri::Authority::as_str))
    }

    fn header_string(&self, name: &HeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// Body of a [`ProxyResponse`].
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// No body.
    #[default]
    Empty,
    /// A fully rendered body.
    Buffered(Bytes),
    /// An object body streamed from the store.
    Streaming(StreamingBlob),
}

impl ResponseBody {
    /// Read the whole body into memory.
    pub async fn collect(self) -> io::Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streaming(blob) => blob.collect().await,
        }
    }
}

/// The proxy's answer to a request.
///
/// `error` carries the failure that produced the status, if any, even when
/// a fallback page was served as the body.
#[derive(Debug)]
pub struct ProxyResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
    /// The error behind a non-success response.
    pub error: Option<ProxyError>,
}

impl ProxyResponse {
    /// An empty response with `status`.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            error: None,
        }
    }

    /// A status-only response for `err`.
    #[must_use]
    pub fn from_error(err: ProxyError) -> Self {
        Self {
            status: err.status(),
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            error: Some(err),
        }
    }
}

type NextHandler = Box<dyn FnOnce(ProxyRequest) -> BoxFuture<'static, ProxyResponse> + Send>;

/// The handler a `pass_through` error page hands the request to.
///
/// Consumed at most once.
pub struct Next {
    handler: NextHandler,
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

impl Next {
    /// Wrap an async handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: FnOnce(ProxyRequest) -> Fut + Send + 'static,
        Fut: Future<Output = ProxyResponse> + Send + 'static,
    {
        Self {
            handler: Box::new(move |request| handler(request).boxed()),
        }
    }

    /// A handler that answers 404 with an empty body.
    #[must_use]
    pub fn terminal() -> Self {
        Self::new(|_| async { ProxyResponse::new(StatusCode::NOT_FOUND) })
    }

    /// Invoke the handler.
    pub async fn run(self, request: ProxyRequest) -> ProxyResponse {
        (self.handler)(request).await
    }
}

/// Per-request state derived once from the incoming request.
#[derive(Debug)]
struct RequestContext {
    key: ResolvedKey,
    conditional: ConditionalParams,
    query: Option<String>,
    format: ListingFormat,
}

impl RequestContext {
    fn new(request: &ProxyRequest, key: ResolvedKey) -> Self {
        Self {
            key,
            conditional: ConditionalParams::from_headers(&request.headers),
            query: request.uri.query().map(ToOwned::to_owned),
            format: ListingFormat::negotiate(&request.headers),
        }
    }
}

/// Serves a bucket over HTTP semantics.
#[derive(Debug, Clone)]
pub struct S3Proxy {
    config: Arc<ProxyConfig>,
    fetcher: ObjectFetcher,
    hidden: HiddenMatcher,
    error_pages: ErrorPageResolver,
    renderer: ListingRenderer,
}

impl S3Proxy {
    /// Create a proxy over `store`.
    pub fn new(config: ProxyConfig, store: Arc<dyn ObjectStore>) -> Self {
        let fetcher = ObjectFetcher::new(store, &config);
        let hidden = HiddenMatcher::new(&config.hide);
        let error_pages = ErrorPageResolver::new(&config);
        Self {
            config: Arc::new(config),
            fetcher,
            hidden,
            error_pages,
            renderer: ListingRenderer::default(),
        }
    }

    /// Render HTML listings with `template` instead of the built-in one.
    #[must_use]
    pub fn with_listing_template(mut self, template: Arc<dyn ListingTemplate>) -> Self {
        self.renderer = ListingRenderer::new(template);
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Handle one request. `next` runs only on a `pass_through` decision.
    pub async fn handle(&self, request: ProxyRequest, next: Next) -> ProxyResponse {
        let root = expand_root(&self.config.root, request.host());
        let key = ResolvedKey::resolve(&root, request.uri.path());
        debug!(method = %request.method, key = %key, "handling request");

        let result = match dispatch::route(&request.method, &key, &self.config) {
            Ok(Operation::Get) => return self.get(request, key, next).await,
            Ok(Operation::Put) => self.put(&request, &key).await,
            Ok(Operation::Delete) => self.delete(&key).await,
            Err(err) => Err(err),
        };

        result.unwrap_or_else(|err| {
            log_failure(&key, &err);
            ProxyResponse::from_error(err)
        })
    }

    async fn get(&self, request: ProxyRequest, key: ResolvedKey, next: Next) -> ProxyResponse {
        if self.hidden.is_hidden(key.path()) {
            debug!(key = %key, "key is hidden");
            let err = ProxyError::not_found(key.path());
            if !self.config.hidden_error_pages {
                return ProxyResponse::from_error(err);
            }
            return self.recover(request, err, next).await;
        }

        let ctx = RequestContext::new(&request, key);
        match self.serve(&ctx).await {
            Ok(response) => response,
            Err(err) => {
                log_failure(&ctx.key, &err);
                self.recover(request, err, next).await
            }
        }
    }

    async fn serve(&self, ctx: &RequestContext) -> Result<ProxyResponse, ProxyError> {
        match self.fetcher.fetch(&ctx.key, &ctx.conditional).await? {
            FetchOutcome::Object(output) => Ok(object_response(StatusCode::OK, *output, false)),
            FetchOutcome::Directory if self.config.enable_browse => self.browse(ctx).await,
            FetchOutcome::Directory => Err(ProxyError::directory_forbidden()),
        }
    }

    async fn browse(&self, ctx: &RequestContext) -> Result<ProxyResponse, ProxyError> {
        let input = listing::build_list_input(&self.config, &ctx.key, ctx.query.as_deref());
        debug!(bucket = %input.bucket, prefix = ?input.prefix, "listing directory");
        let output = self.fetcher.store().list_objects_v2(input).await?;

        let page = ListingPage::from_output(&output, Utc::now());
        let rendered = self
            .renderer
            .render(&page, ctx.format)
            .map_err(|err| anyhow::Error::new(err).context("rendering directory listing"))?;

        let mut response = ProxyResponse::new(StatusCode::OK);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(rendered.content_type));
        response.body = ResponseBody::Buffered(rendered.body);
        Ok(response)
    }

    async fn recover(&self, request: ProxyRequest, err: ProxyError, next: Next) -> ProxyResponse {
        let decision = self.error_pages.decide(err.status());
        match decision.action {
            ErrorAction::PassThrough => {
                debug!(status = %decision.status, "passing request through");
                next.run(request).await
            }
            ErrorAction::StatusOnly => ProxyResponse::from_error(err),
            ErrorAction::ServeFallback(page) => {
                match self.error_pages.fetch_fallback(&self.fetcher, &page).await {
                    Some(output) => {
                        let mut response = object_response(decision.status, output, true);
                        response.error = Some(err);
                        response
                    }
                    None => ProxyResponse::from_error(err),
                }
            }
        }
    }

    async fn put(
        &self,
        request: &ProxyRequest,
        key: &ResolvedKey,
    ) -> Result<ProxyResponse, ProxyError> {
        let input = PutObjectInput {
            bucket: self.config.bucket.clone(),
            key: key.store_key().to_owned(),
            body: request.body.clone(),
            cache_control: request.header_string(&CACHE_CONTROL),
            content_disposition: request.header_string(&CONTENT_DISPOSITION),
            content_encoding: request.header_string(&CONTENT_ENCODING),
            content_language: request.header_string(&CONTENT_LANGUAGE),
            content_type: request.header_string(&CONTENT_TYPE),
        };
        debug!(bucket = %input.bucket, key = %input.key, len = input.body.len(), "put to store");

        let output = self.fetcher.store().put_object(input).await?;
        let mut response = ProxyResponse::new(StatusCode::OK);
        set_header(&mut response.headers, ETAG, output.e_tag.as_deref());
        Ok(response)
    }

    async fn delete(&self, key: &ResolvedKey) -> Result<ProxyResponse, ProxyError> {
        let input = DeleteObjectInput {
            bucket: self.config.bucket.clone(),
            key: key.store_key().to_owned(),
        };
        debug!(bucket = %input.bucket, key = %input.key, "delete from store");
        self.fetcher.store().delete_object(input).await?;
        Ok(ProxyResponse::new(StatusCode::OK))
    }
}

fn log_failure(key: &ResolvedKey, err: &ProxyError) {
    let status = err.status();
    if status.is_server_error() {
        error!(key = %key, status = %status, error = %err, "request failed");
    } else if status == StatusCode::FORBIDDEN {
        warn!(key = %key, status = %status, error = %err, "request failed");
    } else {
        debug!(key = %key, status = %status, error = %err, "request failed");
    }
}

/// Build a response from a retrieved object.
///
/// For a fallback page only the content headers are copied; validators
/// and ranges describe the fallback, not the requested resource.
fn object_response(status: StatusCode, output: GetObjectOutput, fallback: bool) -> ProxyResponse {
    let mut headers = HeaderMap::new();
    set_header(&mut headers, CACHE_CONTROL, output.cache_control.as_deref());
    set_header(&mut headers, CONTENT_DISPOSITION, output.content_disposition.as_deref());
    set_header(&mut headers, CONTENT_ENCODING, output.content_encoding.as_deref());
    set_header(&mut headers, CONTENT_LANGUAGE, output.content_language.as_deref());
    set_header(&mut headers, CONTENT_TYPE, output.content_type.as_deref());
    set_header(&mut headers, EXPIRES, output.expires.as_deref());

    let mut status = status;
    if !fallback {
        set_header(&mut headers, ETAG, output.e_tag.as_deref());
        if let Some(last_modified) = output.last_modified {
            let formatted = httpdate::fmt_http_date(SystemTime::from(last_modified));
            set_header(&mut headers, LAST_MODIFIED, Some(&formatted));
        }
        if output.content_range.is_some() && status == StatusCode::OK {
            status = StatusCode::PARTIAL_CONTENT;
        }
        set_header(&mut headers, CONTENT_RANGE, output.content_range.as_deref());
    }

    for (name, value) in &output.metadata {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!(header = %name, "skipping metadata that is not a valid header"),
        }
    }

    if let Some(len) = output.content_length.and_then(|len| u64::try_from(len).ok()) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }

    ProxyResponse {
        status,
        headers,
        body: ResponseBody::Streaming(output.body),
        error: None,
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: Option<&str>) {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return;
    };
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => debug!(header = %name, "skipping invalid header value"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Duration, TimeZone};
    use http::header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE, RANGE};

    use super::*;
    use crate::memory::{InMemoryObjectStore, MemoryObject};
    use crate::utils::compute_etag;

    const BUCKET: &str = "my-bucket";
    const JSON_BODY: &str = r#"{"foo": "bar"}"#;

    fn modified_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0)
            .single()
            .expect("date")
    }

    fn seeded_store() -> Arc<InMemoryObjectStore> {
        let store = InMemoryObjectStore::new().with_bucket(BUCKET);
        let put = |key: &str, object: MemoryObject| {
            store.insert(BUCKET, key, object).expect("insert");
        };
        put(
            "test.json",
            MemoryObject::builder()
                .data(JSON_BODY)
                .content_type("application/json")
                .cache_control("max-age=60")
                .metadata(BTreeMap::from([("x-owner".to_owned(), "ops".to_owned())]))
                .last_modified(modified_at())
                .build(),
        );
        put(
            "inner/index.html",
            MemoryObject::builder().data("my index.html").build(),
        );
        put("_404.txt", MemoryObject::builder().data("this is 404").build());
        put(
            "default_error_page.txt",
            MemoryObject::builder()
                .data("this is a default error page")
                .content_type("text/plain")
                .build(),
        );
        put("dir/a.txt", MemoryObject::builder().data("aaa").build());
        put("dir/sub/b.txt", MemoryObject::builder().data("bbb").build());
        Arc::new(store)
    }

    fn config() -> ProxyConfig {
        ProxyConfig::builder()
            .bucket(BUCKET.to_owned())
            .index_names(vec![])
            .build()
    }

    fn proxy(config: ProxyConfig) -> (S3Proxy, Arc<InMemoryObjectStore>) {
        let store = seeded_store();
        (S3Proxy::new(config, store.clone()), store)
    }

    fn get(path: &str) -> ProxyRequest {
        ProxyRequest::new(Method::GET, path.parse().expect("uri"))
    }

    async fn send(proxy: &S3Proxy, request: ProxyRequest) -> (ProxyResponse, String) {
        let mut response = proxy.handle(request, Next::terminal()).await;
        let body = std::mem::take(&mut response.body)
            .collect()
            .await
            .expect("body");
        (response, String::from_utf8(body.to_vec()).expect("utf8"))
    }

    fn header<'a>(response: &'a ProxyResponse, name: &HeaderName) -> Option<&'a str> {
        response.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_should_get_simple_object_with_headers() {
        let (proxy, _) = proxy(config());
        let (response, body) = send(&proxy, get("/test.json")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, JSON_BODY);
        assert_eq!(header(&response, &CONTENT_TYPE), Some("application/json"));
        assert_eq!(header(&response, &CACHE_CONTROL), Some("max-age=60"));
        assert_eq!(header(&response, &CONTENT_LENGTH), Some("14"));
        assert_eq!(
            header(&response, &LAST_MODIFIED),
            Some("Mon, 01 Jun 2020 12:00:00 GMT")
        );
        assert_eq!(
            header(&response, &ETAG),
            Some(compute_etag(JSON_BODY.as_bytes()).as_str())
        );
        assert_eq!(
            response.headers.get("x-owner").and_then(|v| v.to_str().ok()),
            Some("ops")
        );
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_should_apply_root_prefix() {
        let store = InMemoryObjectStore::new().with_bucket(BUCKET);
        store
            .insert(BUCKET, "site/a.txt", MemoryObject::builder().data("in site").build())
            .expect("insert");
        let config = ProxyConfig::builder()
            .bucket(BUCKET.to_owned())
            .root("/site".to_owned())
            .build();
        let proxy = S3Proxy::new(config, Arc::new(store));
        let (response, body) = send(&proxy, get("/a.txt")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, "in site");
    }

    #[tokio::test]
    async fn test_should_expand_host_in_root() {
        let store = InMemoryObjectStore::new().with_bucket(BUCKET);
        store
            .insert(BUCKET, "example.com/a.txt", MemoryObject::builder().data("host a").build())
            .expect("insert");
        let config = ProxyConfig::builder()
            .bucket(BUCKET.to_owned())
            .root("/{host}".to_owned())
            .build();
        let proxy = S3Proxy::new(config, Arc::new(store));
        let request =
            get("/a.txt").with_header(HOST, HeaderValue::from_static("example.com:8080"));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, "host a");
    }

    #[tokio::test]
    async fn test_should_not_escape_root_through_host() {
        let store = InMemoryObjectStore::new().with_bucket(BUCKET);
        store
            .insert(BUCKET, "secret/a.txt", MemoryObject::builder().data("top secret").build())
            .expect("insert");
        let config = ProxyConfig::builder()
            .bucket(BUCKET.to_owned())
            .root("/sites/{host}".to_owned())
            .build();
        let proxy = S3Proxy::new(config, Arc::new(store));
        let request = get("/a.txt").with_header(HOST, HeaderValue::from_static("../secret"));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_not_serve_hidden_files() {
        let mut cfg = config();
        cfg.hide = vec!["test.json".to_owned()];
        cfg.default_error_page = Some("default_error_page.txt".to_owned());
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/test.json")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_route_hidden_files_through_error_pages_when_enabled() {
        let mut cfg = config();
        cfg.hide = vec!["test.json".to_owned()];
        cfg.default_error_page = Some("default_error_page.txt".to_owned());
        cfg.hidden_error_pages = true;
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/test.json")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(body, "this is a default error page");
    }

    #[tokio::test]
    async fn test_should_reject_unsupported_methods() {
        let (proxy, _) = proxy(config());
        let request = ProxyRequest::new(Method::POST, "/test.json".parse().expect("uri"));
        let (response, _) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_should_delete_only_when_allowed() {
        let (proxy, store) = proxy(config());
        let request = ProxyRequest::new(Method::DELETE, "/test.json".parse().expect("uri"));
        let (response, _) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

        let mut cfg = config();
        cfg.enable_delete = true;
        let proxy = S3Proxy::new(cfg, store);
        let request = ProxyRequest::new(Method::DELETE, "/test.json".parse().expect("uri"));
        let (response, _) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::OK);

        let (response, _) = send(&proxy, get("/test.json")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_put_only_when_allowed() {
        let upload = || {
            ProxyRequest::new(Method::PUT, "/new.txt".parse().expect("uri"))
                .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
                .with_header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .with_body("uploaded")
        };

        let (proxy, store) = proxy(config());
        let (response, _) = send(&proxy, upload()).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

        let mut cfg = config();
        cfg.enable_put = true;
        let proxy = S3Proxy::new(cfg, store);
        let (response, _) = send(&proxy, upload()).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            header(&response, &ETAG),
            Some(compute_etag(b"uploaded").as_str())
        );

        let (response, body) = send(&proxy, get("/new.txt")).await;
        assert_eq!(body, "uploaded");
        assert_eq!(header(&response, &CONTENT_TYPE), Some("text/plain"));
        assert_eq!(header(&response, &CACHE_CONTROL), Some("no-cache"));
    }

    #[tokio::test]
    async fn test_should_reject_writes_to_directories() {
        let mut cfg = config();
        cfg.enable_put = true;
        cfg.enable_delete = true;
        let (proxy, _) = proxy(cfg);
        for method in [Method::PUT, Method::DELETE] {
            let request = ProxyRequest::new(method, "/dir/".parse().expect("uri"));
            let (response, _) = send(&proxy, request).await;
            assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[tokio::test]
    async fn test_should_serve_index_html() {
        let mut cfg = config();
        cfg.index_names = vec!["index.html".to_owned()];
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/inner/")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, "my index.html");
    }

    #[tokio::test]
    async fn test_should_forbid_directory_without_browse() {
        let (proxy, _) = proxy(config());
        let (response, _) = send(&proxy, get("/inner/")).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_return_404_if_not_found() {
        let (proxy, _) = proxy(config());
        let (response, body) = send(&proxy, get("/nope.txt")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_should_serve_per_status_error_page() {
        let mut cfg = config();
        cfg.error_pages = BTreeMap::from([(404, "_404.txt".to_owned())]);
        cfg.default_error_page = Some("default_error_page.txt".to_owned());
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/nope.txt")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(body, "this is 404");
        assert!(response.headers.get(ETAG).is_none());
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_should_serve_default_error_page() {
        let mut cfg = config();
        cfg.default_error_page = Some("default_error_page.txt".to_owned());
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/nope.txt")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(body, "this is a default error page");
        assert_eq!(header(&response, &CONTENT_TYPE), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_should_keep_status_when_error_page_is_missing() {
        let mut cfg = config();
        cfg.default_error_page = Some("missing_page.txt".to_owned());
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/nope.txt")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_pass_through_to_next_handler() {
        let mut cfg = config();
        cfg.error_pages = BTreeMap::from([(404, "pass_through".to_owned())]);
        let (proxy, _) = proxy(cfg);

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let next = Next::new(move |request: ProxyRequest| async move {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.uri.path(), "/nope.txt");
            ProxyResponse::new(StatusCode::IM_A_TEAPOT)
        });

        let response = proxy.handle(get("/nope.txt"), next).await;
        assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
        assert!(matches!(response.body, ResponseBody::Empty));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_return_partial_content_for_range() {
        let (proxy, _) = proxy(config());
        let request = get("/test.json").with_header(RANGE, HeaderValue::from_static("bytes=0-4"));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body, r#"{"foo"#);
        assert_eq!(header(&response, &CONTENT_RANGE), Some("bytes 0-4/14"));
    }

    #[tokio::test]
    async fn test_should_not_dress_negotiation_statuses_with_error_pages() {
        let mut cfg = config();
        cfg.default_error_page = Some("default_error_page.txt".to_owned());
        let (proxy, _) = proxy(cfg);
        let request = get("/test.json").with_header(RANGE, HeaderValue::from_static("bytes=100-"));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_honour_if_match() {
        let (proxy, _) = proxy(config());
        let etag = compute_etag(JSON_BODY.as_bytes());

        let request =
            get("/test.json").with_header(IF_MATCH, HeaderValue::from_str(&etag).expect("etag"));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, JSON_BODY);

        let request = get("/test.json")
            .with_header(IF_MATCH, HeaderValue::from_static("\"no good etag\""));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_honour_if_none_match() {
        let (proxy, _) = proxy(config());
        let etag = compute_etag(JSON_BODY.as_bytes());

        let request = get("/test.json")
            .with_header(IF_NONE_MATCH, HeaderValue::from_str(&etag).expect("etag"));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::NOT_MODIFIED);
        assert!(body.is_empty());

        let request = get("/test.json")
            .with_header(IF_NONE_MATCH, HeaderValue::from_static("\"no good etag\""));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, JSON_BODY);
    }

    #[tokio::test]
    async fn test_should_honour_modification_dates() {
        let (proxy, _) = proxy(config());
        let before = httpdate::fmt_http_date(SystemTime::from(modified_at() - Duration::days(1)));
        let after = httpdate::fmt_http_date(SystemTime::from(modified_at() + Duration::days(1)));
        let date = |value: &str| HeaderValue::from_str(value).expect("date");

        let request = get("/test.json").with_header(IF_UNMODIFIED_SINCE, date(&after));
        assert_eq!(send(&proxy, request).await.0.status, StatusCode::OK);

        let request = get("/test.json").with_header(IF_UNMODIFIED_SINCE, date(&before));
        assert_eq!(
            send(&proxy, request).await.0.status,
            StatusCode::PRECONDITION_FAILED
        );

        let request = get("/test.json").with_header(IF_MODIFIED_SINCE, date(&after));
        assert_eq!(send(&proxy, request).await.0.status, StatusCode::NOT_MODIFIED);

        let request = get("/test.json").with_header(IF_MODIFIED_SINCE, date(&before));
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(body, JSON_BODY);
    }

    #[tokio::test]
    async fn test_should_browse_directory_as_html() {
        let mut cfg = config();
        cfg.enable_browse = true;
        let (proxy, _) = proxy(cfg);
        let (response, body) = send(&proxy, get("/dir/")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            header(&response, &CONTENT_TYPE),
            Some("text/html; charset=utf-8")
        );
        assert!(body.contains(">sub</a>"));
        assert!(body.contains(">a.txt</a>"));
        assert!(body.contains("number of items: 2"));
    }

    #[tokio::test]
    async fn test_should_browse_directory_as_json_with_pagination() {
        let mut cfg = config();
        cfg.enable_browse = true;
        let (proxy, _) = proxy(cfg);
        let json = HeaderValue::from_static("application/json");

        let request = get("/dir/?max=1").with_header(CONTENT_TYPE, json.clone());
        let (response, body) = send(&proxy, request).await;
        assert_eq!(response.status, StatusCode::OK);
        let first: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert_eq!(first["count"], 1);
        assert_eq!(first["items"][0]["name"], "a.txt");
        assert_eq!(first["items"][0]["url"], "./a.txt");
        let more = first["more"].as_str().expect("more link").to_owned();
        assert!(more.starts_with("?max=1&next="));

        let request = get(&format!("/dir/{more}")).with_header(CONTENT_TYPE, json);
        let (_, body) = send(&proxy, request).await;
        let second: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert_eq!(second["items"][0]["name"], "sub");
        assert_eq!(second["items"][0]["is_dir"], true);
        assert_eq!(second["more"], "");
    }

    #[tokio::test]
    async fn test_should_prefer_index_over_listing() {
        let mut cfg = config();
        cfg.enable_browse = true;
        cfg.index_names = vec!["index.html".to_owned()];
        let (proxy, _) = proxy(cfg);
        let (_, body) = send(&proxy, get("/inner/")).await;
        assert_eq!(body, "my index.html");
    }

    #[tokio::test]
    async fn test_should_classify_listing_errors() {
        let mut cfg = config();
        cfg.enable_browse = true;
        cfg.bucket = "missing-bucket".to_owned();
        let (proxy, _) = proxy(cfg);
        let (response, _) = send(&proxy, get("/dir/")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_not_escape_root_with_traversal() {
        let store = InMemoryObjectStore::new().with_bucket(BUCKET);
        store
            .insert(BUCKET, "secret.txt", MemoryObject::builder().data("secret").build())
            .expect("insert");
        let config = ProxyConfig::builder()
            .bucket(BUCKET.to_owned())
            .root("/public".to_owned())
            .build();
        let proxy = S3Proxy::new(config, Arc::new(store));
        let (response, _) = send(&proxy, get("/../secret.txt")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
