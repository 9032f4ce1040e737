//! Method routing.

use http::Method;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::path::ResolvedKey;

/// The operation a request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Serve an object, index file or listing.
    Get,
    /// Upload an object.
    Put,
    /// Delete an object.
    Delete,
}

/// Map a request method to an operation.
///
/// PUT and DELETE are only allowed on object keys and only when enabled;
/// anything else is 405.
pub fn route(
    method: &Method,
    key: &ResolvedKey,
    config: &ProxyConfig,
) -> Result<Operation, ProxyError> {
    let (operation, enabled) = match *method {
        Method::GET => return Ok(Operation::Get),
        Method::PUT => (Operation::Put, config.enable_put),
        Method::DELETE => (Operation::Delete, config.enable_delete),
        _ => return Err(ProxyError::method_not_allowed()),
    };
    if !enabled || key.is_directory() {
        return Err(ProxyError::method_not_allowed());
    }
    Ok(operation)
}
