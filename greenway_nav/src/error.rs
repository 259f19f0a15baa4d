// Error types for the two fallible seams of the crate: loading a config and
// collecting an off-thread path result.
//
// Everything else (rebuilds, searches, reachability) degrades to a no-op or
// to "no path" instead of returning an error.

use thiserror::Error;

/// Errors raised while loading or validating a `NavConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config field `{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors raised when collecting the result of a dispatched path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The worker serving this request died or its channel closed before a
    /// result was delivered. Only requests in flight on that worker see this.
    #[error("path worker was lost before the request completed")]
    WorkerLost,
}
