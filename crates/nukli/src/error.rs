//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text
//! and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

/// Exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Missing bridge host")]
    #[diagnostic(
        code(nukli::no_host),
        help(
            "Set NB_HOST, pass -H <host>[:<port>], or add a profile to {path}.\n\
             Run `nukli discover` to find bridges on your network."
        )
    )]
    MissingHost { path: String },

    #[error("Missing bridge token")]
    #[diagnostic(
        code(nukli::no_token),
        help(
            "Set NB_TOKEN or pass -T <token>.\n\
             Run `nukli auth` and press the bridge button to obtain one."
        )
    )]
    MissingToken,

    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(nukli::validation))]
    Validation { field: String, reason: String },

    // ── Bridge outcomes ──────────────────────────────────────────────

    #[error("No token granted")]
    #[diagnostic(
        code(nukli::auth_pending),
        help("Press the button on the bridge, then run `nukli auth` again.")
    )]
    AuthPending,

    #[error("Bridge rejected the request: {message}")]
    #[diagnostic(code(nukli::rejected))]
    Rejected { message: String },

    // ── Wrapped library errors ───────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(nukli::api))]
    Api(#[from] nukli_api::Error),

    #[error("{0}")]
    #[diagnostic(code(nukli::listener))]
    Listener(#[from] nukli_listener::ListenerError),

    #[error("{0}")]
    #[diagnostic(code(nukli::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingHost { .. } | Self::MissingToken | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::AuthPending => exit_code::AUTH,
            Self::Api(err) if err.is_timeout() => exit_code::TIMEOUT,
            Self::Api(nukli_api::Error::Config { .. }) => exit_code::USAGE,
            Self::Api(_) => exit_code::CONNECTION,
            Self::Rejected { .. } | Self::Listener(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}
