//! Store error code to HTTP status classification.

use http::StatusCode;
use s3proxy_model::StoreErrorCode;

/// Map a store error code to the HTTP status reported to the client.
///
/// Unmapped codes are reported as 500.
#[must_use]
pub fn status_for(code: &StoreErrorCode) -> StatusCode {
    status_for_code(code.as_str())
}

/// Map a raw store error code string to an HTTP status.
#[must_use]
#[allow(clippy::match_same_arms, clippy::too_many_lines)]
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "NotModified" => StatusCode::NOT_MODIFIED,
        "PermanentRedirect" => StatusCode::MOVED_PERMANENTLY,
        "Redirect" | "TemporaryRedirect" => StatusCode::TEMPORARY_REDIRECT,

        "AmbiguousGrantByEmailAddress"
        | "AuthorizationHeaderMalformed"
        | "BadDigest"
        | "CredentialsNotSupported"
        | "EntityTooSmall"
        | "EntityTooLarge"
        | "ExpiredToken"
        | "IllegalLocationConstraintException"
        | "IllegalVersioningConfigurationException"
        | "IncompleteBody"
        | "IncorrectNumberOfFilesInPostRequest"
        | "InlineDataTooLarge"
        | "InvalidAccessPoint"
        | "InvalidArgument"
        | "InvalidBucketName"
        | "InvalidDigest"
        | "InvalidEncryptionAlgorithmError"
        | "InvalidLocationConstraint"
        | "InvalidPart"
        | "InvalidPartOrder"
        | "InvalidPolicyDocument"
        | "InvalidRequest"
        | "InvalidSOAPRequest"
        | "InvalidStorageClass"
        | "InvalidTargetBucketForLogging"
        | "InvalidToken"
        | "InvalidURI"
        | "KeyTooLongError"
        | "MalformedACLError"
        | "MalformedPOSTRequest"
        | "MalformedXML"
        | "MaxMessageLengthExceeded"
        | "MaxPostPreDataLengthExceededError"
        | "MetadataTooLarge"
        | "MissingRequestBodyError"
        | "MissingSecurityElement"
        | "MissingSecurityHeader"
        | "NoLoggingStatusForKey"
        | "RequestIsNotMultiPartContent"
        | "RequestTimeout"
        | "RequestTorrentOfBucketError"
        | "ServerSideEncryptionConfigurationNotFoundError"
        | "TokenRefreshRequired"
        | "TooManyAccessPoints"
        | "TooManyBuckets"
        | "UnexpectedContent"
        | "UnresolvableGrantByEmailAddress"
        | "UserKeyMustBeSpecified"
        | "NoSuchAccessPoint"
        | "InvalidTag"
        | "MalformedPolicy" => StatusCode::BAD_REQUEST,

        "AccessDenied"
        | "AccountProblem"
        | "AllAccessDisabled"
        | "CrossLocationLoggingProhibited"
        | "InvalidAccessKeyId"
        | "InvalidObjectState"
        | "InvalidPayer"
        | "InvalidSecurity"
        | "NotSignedUp"
        | "RequestTimeTooSkewed"
        | "SignatureDoesNotMatch" => StatusCode::FORBIDDEN,

        "NoSuchBucket"
        | "NoSuchBucketPolicy"
        | "NoSuchKey"
        | "NoSuchLifecycleConfiguration"
        | "NoSuchUpload"
        | "NoSuchVersion"
        | "NotFound"
        | "ObjectNotInActiveTierError" => StatusCode::NOT_FOUND,

        "MethodNotAllowed" => StatusCode::METHOD_NOT_ALLOWED,

        "BucketAlreadyExists"
        | "BucketAlreadyOwnedByYou"
        | "BucketNotEmpty"
        | "InvalidBucketState"
        | "OperationAborted"
        | "RestoreAlreadyInProgress" => StatusCode::CONFLICT,

        "MissingContentLength" => StatusCode::LENGTH_REQUIRED,
        "PreconditionFailed" => StatusCode::PRECONDITION_FAILED,
        "InvalidRange" => StatusCode::RANGE_NOT_SATISFIABLE,
        "InternalError" => StatusCode::INTERNAL_SERVER_ERROR,
        "NotImplemented" => StatusCode::NOT_IMPLEMENTED,
        "ServiceUnavailable" | "SlowDown" => StatusCode::SERVICE_UNAVAILABLE,

        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Whether the code belongs to the not-found class.
#[must_use]
pub fn is_not_found(code: &StoreErrorCode) -> bool {
    status_for(code) == StatusCode::NOT_FOUND
}

/// Whether the status is a conditional/range negotiation outcome.
///
/// These are never dressed with fallback pages.
#[must_use]
pub fn is_negotiation_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_MODIFIED
            | StatusCode::PRECONDITION_FAILED
            | StatusCode::RANGE_NOT_SATISFIABLE
    )
}
