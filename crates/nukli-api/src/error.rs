use std::fmt;

use thiserror::Error;

/// Metadata identifying the request an error originated from.
///
/// The `resource` is the path plus caller-supplied query parameters; the
/// authentication suffix is never included, so the value is safe to log.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Per-client sequence number (first request is 1).
    pub id: u64,
    pub method: &'static str,
    pub resource: String,
}

impl RequestInfo {
    pub(crate) fn new(id: u64, resource: impl Into<String>) -> Self {
        Self {
            id,
            method: "GET",
            resource: resource.into(),
        }
    }
}

impl fmt::Display for RequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request {}: {} {}", self.id, self.method, self.resource)
    }
}

/// Top-level error type for the `nukli-api` crate.
///
/// `Config` is fatal and raised before any network I/O; `Transport` and
/// `Timeout` carry the originating request's metadata so callers can log
/// which call failed. The `/auth` "button not pressed" outcome is not an
/// error -- `BridgeClient::auth` returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Invalid constructor parameters or a missing token where the
    /// encryption mode requires one. Never retried.
    #[error("configuration error: {message}")]
    Config { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Network failure, non-2xx status, or an undecodable response body.
    #[error("{request}: {message}")]
    Transport {
        request: RequestInfo,
        /// HTTP status, when the failure happened after a response arrived.
        status: Option<u16>,
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("{request}: timed out after {timeout_secs}s")]
    Timeout {
        request: RequestInfo,
        timeout_secs: u64,
    },

    // ── Internal ────────────────────────────────────────────────────
    /// Invariant violations that should not occur in practice
    /// (e.g. the sealing primitive rejecting a plaintext).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The request this error originated from, if it got that far.
    pub fn request(&self) -> Option<&RequestInfo> {
        match self {
            Self::Transport { request, .. } | Self::Timeout { request, .. } => Some(request),
            _ => None,
        }
    }

    /// HTTP status attached to the failure, if a response arrived at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
