//! The hyper service fronting [`S3Proxy`].
//!
//! [`ProxyHttpService`] handles:
//!
//! 1. Health check interception (`GET /_health`)
//! 2. Request body collection (PUT only)
//! 3. Handing the request to [`S3Proxy::handle`]
//! 4. Common response headers (`x-request-id`, `Server`)

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue, SERVER};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use s3proxy_core::{Next, ProxyRequest, S3Proxy};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::body::ProxyResponseBody;
use crate::response::{IntoHttpResponse, status_response};

/// Path answered by the built-in health check.
pub const HEALTH_CHECK_PATH: &str = "/_health";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The HTTP service that implements hyper's `Service` trait.
#[derive(Debug, Clone)]
pub struct ProxyHttpService {
    proxy: Arc<S3Proxy>,
}

impl ProxyHttpService {
    /// Create a service around `proxy`.
    #[must_use]
    pub fn new(proxy: S3Proxy) -> Self {
        Self {
            proxy: Arc::new(proxy),
        }
    }

    /// Create a service from a shared proxy.
    #[must_use]
    pub fn from_shared(proxy: Arc<S3Proxy>) -> Self {
        Self { proxy }
    }
}

impl Service<http::Request<Incoming>> for ProxyHttpService {
    type Response = http::Response<ProxyResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let proxy = Arc::clone(&self.proxy);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = process_request(req, &proxy, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Run one request through the proxy.
async fn process_request<B>(
    req: http::Request<B>,
    proxy: &S3Proxy,
    request_id: &str,
) -> http::Response<ProxyResponseBody>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    let (parts, incoming) = req.into_parts();
    let body = if parts.method == http::Method::PUT {
        match incoming.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                error!(error = %err, request_id, "failed to collect request body");
                return status_response(http::StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    } else {
        Bytes::new()
    };

    let request = ProxyRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };
    let response = proxy.handle(request, Next::terminal()).await;

    if let Some(err) = &response.error {
        debug!(error = %err, request_id, "request ended with error");
    }
    info!(%method, %uri, status = %response.status, request_id, "handled request");

    response.into_http_response()
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == HEALTH_CHECK_PATH
}

fn health_check_response() -> http::Response<ProxyResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(ProxyResponseBody::from_bytes(Bytes::from_static(
            br#"{"status":"running","service":"s3proxy"}"#,
        )))
        .expect("static health response should be valid")
}

/// Add the headers every response carries.
fn add_common_headers(
    mut response: http::Response<ProxyResponseBody>,
    request_id: &str,
) -> http::Response<ProxyResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(SERVER, HeaderValue::from_static("s3proxy"));
    response
}
