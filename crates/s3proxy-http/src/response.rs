//! Proxy response to HTTP response conversion.

use s3proxy_core::ProxyResponse;

use crate::body::ProxyResponseBody;

/// Conversion of a handler result into a hyper response.
pub trait IntoHttpResponse {
    /// Convert into an HTTP response.
    fn into_http_response(self) -> http::Response<ProxyResponseBody>;
}

impl IntoHttpResponse for ProxyResponse {
    fn into_http_response(self) -> http::Response<ProxyResponseBody> {
        let mut response = http::Response::new(ProxyResponseBody::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// A status-only response.
#[must_use]
pub fn status_response(status: http::StatusCode) -> http::Response<ProxyResponseBody> {
    let mut response = http::Response::new(ProxyResponseBody::empty());
    *response.status_mut() = status;
    response
}
