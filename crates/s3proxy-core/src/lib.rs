//! Serve objects from a bucket like a web server.
//!
//! This crate turns HTTP requests into object store calls and store results
//! back into HTTP responses. It knows nothing about sockets; the HTTP layer
//! feeds it [`ProxyRequest`]s and writes out the [`ProxyResponse`]s.
//!
//! # Architecture
//!
//! ```text
//!  S3Proxy::handle
//!        |
//!        +-- path      (root + request path -> ResolvedKey)
//!        +-- dispatch  (GET / PUT / DELETE, capability flags)
//!        +-- hidden    (hide patterns -> 404)
//!        +-- fetch     (index probing, conditional GET)
//!        +-- listing   (directory pages, JSON / HTML)
//!        +-- error_page (fallback objects, pass-through)
//!        |
//!        v
//!   ObjectStore (aws backend or InMemoryObjectStore)
//! ```

pub mod classify;
pub mod conditional;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod error_page;
pub mod fetch;
pub mod hidden;
pub mod listing;
pub mod memory;
pub mod path;
pub mod proxy;
pub mod store;
pub mod utils;

pub use config::{ConfigError, ProxyConfig, StoreBackend};
pub use error::ProxyError;
pub use memory::{InMemoryObjectStore, MemoryObject};
pub use proxy::{Next, ProxyRequest, ProxyResponse, ResponseBody, S3Proxy};
pub use store::ObjectStore;
