//! Proxy error type.
//!
//! Every failure inside the proxy ends up as a [`ProxyError`]. Store errors
//! are classified into an HTTP status exactly once, when they cross into the
//! proxy; anything that never went through classification is reported as a
//! 500.

use http::StatusCode;
use s3proxy_model::{StoreError, StoreErrorCode};

use crate::classify;

/// A failed proxy request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// An outcome with a known HTTP status.
    #[error("{status}: {message}")]
    Classified {
        /// Status to report to the client.
        status: StatusCode,
        /// Human-readable description.
        message: String,
        /// The store error this was classified from, if any.
        #[source]
        store: Option<StoreError>,
    },

    /// Anything else; reported as 500.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl ProxyError {
    /// Create an error with an explicit status.
    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Classified {
            status,
            message: message.into(),
            store: None,
        }
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(key: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, format!("not found: {key}"))
    }

    /// 403 for a directory that cannot be listed.
    #[must_use]
    pub fn directory_forbidden() -> Self {
        Self::with_status(StatusCode::FORBIDDEN, "can not view a directory")
    }

    /// 405 Method Not Allowed.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::with_status(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    /// The HTTP status this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Classified { status, .. } => *status,
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The store error code, when this error came from the store.
    #[must_use]
    pub fn store_code(&self) -> Option<&StoreErrorCode> {
        match self {
            Self::Classified {
                store: Some(err), ..
            } => Some(&err.code),
            _ => None,
        }
    }
}

impl From<StoreError> for ProxyError {
    fn from(err: StoreError) -> Self {
        Self::Classified {
            status: classify::status_for(&err.code),
            message: err.message.clone(),
            store: Some(err),
        }
    }
}
