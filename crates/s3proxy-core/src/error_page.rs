//! Fallback pages for failed GET requests.

use std::collections::BTreeMap;

use http::StatusCode;
use s3proxy_model::GetObjectOutput;
use tracing::error;

use crate::classify::is_negotiation_status;
use crate::config::ProxyConfig;
use crate::fetch::ObjectFetcher;

/// Error page value that hands the request to the next handler.
pub const PASS_THROUGH: &str = "pass_through";

/// What to do with a failed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorAction {
    /// Invoke the next handler and write nothing.
    PassThrough,
    /// Serve this key's content with the failure status.
    ServeFallback(String),
    /// Write the status with an empty body.
    StatusOnly,
}

/// An [`ErrorAction`] together with the status it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDecision {
    /// The chosen action.
    pub action: ErrorAction,
    /// The failure status.
    pub status: StatusCode,
}

/// Chooses and fetches error pages.
#[derive(Debug, Clone, Default)]
pub struct ErrorPageResolver {
    pages: BTreeMap<u16, String>,
    default_page: Option<String>,
}

impl ErrorPageResolver {
    /// Build a resolver from the configured error pages.
    #[must_use]
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            pages: config.error_pages.clone(),
            default_page: config.default_error_page.clone().filter(|p| !p.is_empty()),
        }
    }

    /// Decide how to answer a GET that failed with `status`.
    #[must_use]
    pub fn decide(&self, status: StatusCode) -> ErrorDecision {
        let action = if is_negotiation_status(status) {
            ErrorAction::StatusOnly
        } else {
            match self
                .pages
                .get(&status.as_u16())
                .or(self.default_page.as_ref())
            {
                Some(page) if page.is_empty() => ErrorAction::StatusOnly,
                Some(page) if page.eq_ignore_ascii_case(PASS_THROUGH) => ErrorAction::PassThrough,
                Some(page) => ErrorAction::ServeFallback(page.clone()),
                None => ErrorAction::StatusOnly,
            }
        };
        ErrorDecision { action, status }
    }

    /// Fetch a fallback page once. Failures are logged and yield `None`.
    pub async fn fetch_fallback(
        &self,
        fetcher: &ObjectFetcher,
        key: &str,
    ) -> Option<GetObjectOutput> {
        match fetcher.fetch_unconditional(key).await {
            Ok(output) => Some(output),
            Err(err) => {
                error!(
                    bucket = %fetcher.bucket(),
                    key = %key,
                    error = %err,
                    "error serving error page"
                );
                None
            }
        }
    }
}
