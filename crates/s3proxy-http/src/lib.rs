//! HTTP layer for s3proxy.
//!
//! - **Service** ([`service`]): [`ProxyHttpService`](service::ProxyHttpService)
//!   implements hyper's `Service` trait and feeds requests to
//!   [`S3Proxy`](s3proxy_core::S3Proxy).
//! - **Response** ([`response`]): converts a
//!   [`ProxyResponse`](s3proxy_core::ProxyResponse) into an `http::Response`.
//! - **Body** ([`body`]): [`ProxyResponseBody`](body::ProxyResponseBody), which
//!   streams object content straight from the store.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use s3proxy_core::{InMemoryObjectStore, ProxyConfig, S3Proxy};
//! use s3proxy_http::ProxyHttpService;
//!
//! let config = ProxyConfig::builder().bucket("assets".into()).build();
//! let store = Arc::new(InMemoryObjectStore::new().with_bucket("assets"));
//! let service = ProxyHttpService::new(S3Proxy::new(config, store));
//! // Use `service` with hyper server.
//! ```

pub mod body;
pub mod response;
pub mod service;

pub use body::ProxyResponseBody;
pub use response::IntoHttpResponse;
pub use service::ProxyHttpService;
