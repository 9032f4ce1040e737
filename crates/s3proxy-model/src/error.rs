//! Object store error types.
//!
//! [`StoreError`] is returned by every object store call on failure. It
//! carries the store-defined error code verbatim so the proxy can classify
//! it into an HTTP outcome regardless of which backend produced it.

use std::fmt;

/// Store error codes the proxy reasons about directly.
///
/// Every other code reported by a backend is preserved as
/// [`StoreErrorCode::Other`] and still goes through status classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum StoreErrorCode {
    /// AccessDenied error.
    AccessDenied,
    /// InternalError error.
    #[default]
    InternalError,
    /// InvalidArgument error.
    InvalidArgument,
    /// InvalidRange error.
    InvalidRange,
    /// MethodNotAllowed error.
    MethodNotAllowed,
    /// NoSuchBucket error.
    NoSuchBucket,
    /// NoSuchKey error.
    NoSuchKey,
    /// NotFound error, reported by HEAD-style responses without a body.
    NotFound,
    /// NotModified error (HTTP 304).
    NotModified,
    /// ObjectNotInActiveTierError error.
    ObjectNotInActiveTierError,
    /// PreconditionFailed error.
    PreconditionFailed,
    /// ServiceUnavailable error.
    ServiceUnavailable,
    /// SlowDown error.
    SlowDown,
    /// Any other code reported by the store.
    Other(String),
}

impl StoreErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidRange => "InvalidRange",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::NotFound => "NotFound",
            Self::NotModified => "NotModified",
            Self::ObjectNotInActiveTierError => "ObjectNotInActiveTierError",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::SlowDown => "SlowDown",
            Self::Other(s) => s,
        }
    }

    /// Parse a store-reported code, keeping unknown codes as [`Self::Other`].
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            "AccessDenied" => Self::AccessDenied,
            "InternalError" => Self::InternalError,
            "InvalidArgument" => Self::InvalidArgument,
            "InvalidRange" => Self::InvalidRange,
            "MethodNotAllowed" => Self::MethodNotAllowed,
            "NoSuchBucket" => Self::NoSuchBucket,
            "NoSuchKey" => Self::NoSuchKey,
            "NotFound" => Self::NotFound,
            "NotModified" => Self::NotModified,
            "ObjectNotInActiveTierError" => Self::ObjectNotInActiveTierError,
            "PreconditionFailed" => Self::PreconditionFailed,
            "ServiceUnavailable" => Self::ServiceUnavailable,
            "SlowDown" => Self::SlowDown,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::InternalError => "Internal server error",
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidRange => "The requested range is not satisfiable",
            Self::MethodNotAllowed => "The specified method is not allowed against this resource",
            Self::NoSuchBucket => "The specified bucket does not exist",
            Self::NoSuchKey => "The specified key does not exist",
            Self::NotFound => "Not Found",
            Self::NotModified => "Not Modified",
            Self::ObjectNotInActiveTierError => {
                "The source object of the COPY action is not in the active tier"
            }
            Self::PreconditionFailed => {
                "At least one of the preconditions you specified did not hold"
            }
            Self::ServiceUnavailable => "Service is unable to handle request",
            Self::SlowDown => "Please reduce your request rate",
            Self::Other(_) => "Store error",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StoreErrorCode {
    fn from(code: &str) -> Self {
        Self::parse(code)
    }
}

/// An error returned by an object store operation.
#[derive(Debug)]
pub struct StoreError {
    /// The store-defined error code.
    pub code: StoreErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource (bucket or key) the error refers to.
    pub resource: Option<String>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl StoreError {
    /// Create a new StoreError from an error code.
    #[must_use]
    pub fn new(code: StoreErrorCode) -> Self {
        let message = code.default_message().to_owned();
        Self {
            code,
            message,
            resource: None,
            source: None,
        }
    }

    /// Create a new StoreError with a custom message.
    #[must_use]
    pub fn with_message(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
            source: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a NoSuchKey error.
    #[must_use]
    pub fn no_such_key(key: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NoSuchKey).with_resource(key)
    }

    /// Create a NoSuchBucket error.
    #[must_use]
    pub fn no_such_bucket(bucket: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NoSuchBucket).with_resource(bucket)
    }

    /// Create a NotModified error.
    #[must_use]
    pub fn not_modified(key: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotModified).with_resource(key)
    }

    /// Create a PreconditionFailed error.
    #[must_use]
    pub fn precondition_failed(condition: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::PreconditionFailed).with_resource(condition)
    }

    /// Create an InvalidRange error.
    #[must_use]
    pub fn invalid_range(range: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::InvalidRange).with_resource(range)
    }

    /// Create an InternalError error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::InternalError, message)
    }
}

/// Create a [`StoreError`] from an error code.
///
/// # Examples
///
/// ```
/// use s3proxy_model::store_error;
/// use s3proxy_model::error::StoreErrorCode;
///
/// let err = store_error!(NoSuchKey);
/// assert_eq!(err.code, StoreErrorCode::NoSuchKey);
///
/// let err = store_error!(AccessDenied, "nope");
/// assert_eq!(err.message, "nope");
/// ```
#[macro_export]
macro_rules! store_error {
    ($code:ident) => {
        $crate::error::StoreError::new($crate::error::StoreErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::StoreError::with_message($crate::error::StoreErrorCode::$code, $msg)
    };
}
