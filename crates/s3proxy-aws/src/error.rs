//! SDK error to [`StoreError`] mapping.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use s3proxy_model::{StoreError, StoreErrorCode};

/// Convert an SDK failure into a store error.
///
/// The service error code is used when the SDK reports one; otherwise the
/// raw HTTP status is mapped to the closest code. Anything else (timeouts,
/// dispatch failures) is an internal error.
pub(crate) fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err
        .code()
        .map(StoreErrorCode::parse)
        .or_else(|| {
            err.raw_response()
                .map(|raw| code_for_status(raw.status().as_u16()))
        })
        .unwrap_or_default();
    let message = err
        .message()
        .map_or_else(|| code.default_message().to_owned(), ToOwned::to_owned);

    StoreError::with_message(code, message)
        .with_resource(key)
        .with_source(err)
}

/// Map a bare HTTP status from the store to an error code.
pub(crate) fn code_for_status(status: u16) -> StoreErrorCode {
    match status {
        304 => StoreErrorCode::NotModified,
        403 => StoreErrorCode::AccessDenied,
        404 => StoreErrorCode::NoSuchKey,
        412 => StoreErrorCode::PreconditionFailed,
        416 => StoreErrorCode::InvalidRange,
        503 => StoreErrorCode::ServiceUnavailable,
        _ => StoreErrorCode::InternalError,
    }
}
