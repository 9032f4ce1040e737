//! s3proxy server - serves objects from an S3 bucket like a web server.
//!
//! # Usage
//!
//! ```text
//! S3PROXY_BUCKET=my-site GATEWAY_LISTEN=0.0.0.0:8080 s3proxy-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3PROXY_CONFIG` | *(unset)* | Optional JSON configuration file |
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `S3PROXY_BUCKET` | *(required)* | Bucket to serve |
//! | `S3PROXY_BACKEND` | `aws` | `aws` or `memory` |
//! | `S3PROXY_BROWSE_TEMPLATE` | *(unset)* | Jinja template file for HTML listings |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! The remaining `S3PROXY_*` variables are documented on
//! [`ProxyConfig::apply_overrides`].

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use s3proxy_aws::AwsObjectStore;
use s3proxy_core::listing::FileListingTemplate;
use s3proxy_core::{InMemoryObjectStore, ObjectStore, ProxyConfig, S3Proxy, StoreBackend};
use s3proxy_http::ProxyHttpService;
use s3proxy_http::service::HEALTH_CHECK_PATH;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Create the object store selected by the configuration.
async fn build_store(config: &ProxyConfig) -> Arc<dyn ObjectStore> {
    match config.backend {
        StoreBackend::Aws => Arc::new(AwsObjectStore::connect(config).await),
        StoreBackend::Memory => {
            warn!(bucket = %config.bucket, "using the in-memory store; objects are not persisted");
            Arc::new(InMemoryObjectStore::new().with_bucket(config.bucket.clone()))
        }
    }
}

/// Build the proxy, installing the configured listing template if any.
fn build_proxy(config: ProxyConfig, store: Arc<dyn ObjectStore>) -> Result<S3Proxy> {
    let template = config
        .browse_template
        .as_deref()
        .map(FileListingTemplate::load)
        .transpose()
        .context("invalid browse template")?;
    let proxy = S3Proxy::new(config, store);
    Ok(match template {
        Some(template) => {
            info!("using custom listing template");
            proxy.with_listing_template(Arc::new(template))
        }
        None => proxy,
    })
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: ProxyHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Address the health check dials: wildcard binds are reached over loopback.
fn health_check_addr(listen: &str) -> String {
    listen.replace("0.0.0.0", "127.0.0.1")
}

/// Request the health endpoint of a running server.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET {HEALTH_CHECK_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Docker HEALTHCHECK entry point.
    if std::env::args().any(|a| a == "--health-check") {
        let config = ProxyConfig::load_with(|name| std::env::var(name).ok())
            .context("invalid configuration")?;
        let healthy = run_health_check(&health_check_addr(&config.gateway_listen))
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = ProxyConfig::load().context("invalid configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        bucket = %config.bucket,
        root = %config.root,
        backend = ?config.backend,
        enable_browse = config.enable_browse,
        enable_put = config.enable_put,
        enable_delete = config.enable_delete,
        version = VERSION,
        "starting s3proxy server",
    );

    let store = build_store(&config).await;
    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;
    let service = ProxyHttpService::new(build_proxy(config, store)?);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use http::Method;
    use s3proxy_core::{Next, ProxyRequest};

    use super::*;

    #[test]
    fn test_should_dial_loopback_for_wildcard_bind() {
        assert_eq!(health_check_addr("0.0.0.0:8080"), "127.0.0.1:8080");
        assert_eq!(health_check_addr("10.1.2.3:80"), "10.1.2.3:80");
    }

    #[tokio::test]
    async fn test_should_create_configured_bucket_for_memory_backend() {
        let config = ProxyConfig::builder()
            .bucket("site".into())
            .backend(StoreBackend::Memory)
            .enable_browse(true)
            .build();
        let store = build_store(&config).await;
        let proxy = S3Proxy::new(config, store);

        let response = proxy
            .handle(
                ProxyRequest::new(Method::GET, "/".parse().expect("uri")),
                Next::terminal(),
            )
            .await;
        assert_eq!(response.status.as_u16(), 200);
    }

    #[tokio::test]
    async fn test_should_install_browse_template_from_file() {
        let path = std::env::temp_dir()
            .join(format!("s3proxy-server-{}-list.html", std::process::id()));
        std::fs::write(&path, "<p>{{ page.count }} entries</p>").expect("write template");
        let config = ProxyConfig::builder()
            .bucket("site".into())
            .backend(StoreBackend::Memory)
            .enable_browse(true)
            .browse_template(Some(path.clone()))
            .build();
        let store = build_store(&config).await;
        let proxy = build_proxy(config, store);
        std::fs::remove_file(&path).ok();
        let proxy = proxy.expect("template should load");

        let response = proxy
            .handle(
                ProxyRequest::new(Method::GET, "/".parse().expect("uri")),
                Next::terminal(),
            )
            .await;
        assert_eq!(response.status.as_u16(), 200);
        let body = response.body.collect().await.expect("body");
        assert_eq!(&body[..], b"<p>0 entries</p>");
    }

    #[tokio::test]
    async fn test_should_fail_startup_on_missing_browse_template() {
        let config = ProxyConfig::builder()
            .bucket("site".into())
            .backend(StoreBackend::Memory)
            .browse_template(Some("/nonexistent/s3proxy/list.html".into()))
            .build();
        let store = build_store(&config).await;
        assert!(build_proxy(config, store).is_err());
    }
}
