// ── Core error types ──
//
// User-facing errors from inception-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<inception_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to panel at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Panel request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Resolution errors ────────────────────────────────────────────
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    // ── Operation errors ─────────────────────────────────────────────
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Why a configured area selector did not yield an area ID.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Area index {index} is out of range (panel has {len} areas)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No area named {name:?}")]
    NotFound { name: String },

    #[error("Could not list areas: {0}")]
    Api(#[from] inception_api::Error),
}

/// Why a requested state change was not carried out.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Area has not been resolved yet")]
    AreaUnresolved,

    #[error("Panel rejected command: {message}")]
    Rejected { message: String },

    #[error("Command failed: {0}")]
    Api(#[source] inception_api::Error),

    #[error("Command processor is not running")]
    Unavailable,
}

impl From<inception_api::Error> for CommandError {
    fn from(err: inception_api::Error) -> Self {
        match err {
            inception_api::Error::Rejected { message } => Self::Rejected { message },
            other => Self::Api(other),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<inception_api::Error> for CoreError {
    fn from(err: inception_api::Error) -> Self {
        use inception_api::{AuthError, Error as ApiError};

        match err {
            ApiError::Auth(AuthError::Network(e)) => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                reason: e.to_string(),
            },
            ApiError::Auth(AuthError::Rejected { message })
            | ApiError::Auth(AuthError::MalformedResponse { message }) => {
                CoreError::AuthenticationFailed { message }
            }
            ApiError::Unauthorized => CoreError::AuthenticationFailed {
                message: "credential rejected after re-authentication".into(),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::Timeout(duration) => CoreError::Timeout {
                timeout_secs: duration.as_secs(),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::UnexpectedStatus { status, body } => CoreError::Api {
                message: format!("HTTP {status}: {body}"),
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Unreadable panel response: {message}"),
                status: None,
            },
            ApiError::Rejected { message } => CoreError::Command(CommandError::Rejected { message }),
            ApiError::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            ApiError::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            ApiError::Unsupported(op) => CoreError::Unsupported {
                operation: op.to_string(),
                required: "the v1 API dialect".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_to_command_error() {
        let err = CommandError::from(inception_api::Error::Rejected {
            message: "not ready".into(),
        });
        assert!(matches!(err, CommandError::Rejected { ref message } if message == "not ready"));
    }

    #[test]
    fn unauthorized_is_auth_failure() {
        let err = CoreError::from(inception_api::Error::Unauthorized);
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn unsupported_names_dialect() {
        let err = CoreError::from(inception_api::Error::Unsupported("update stream"));
        assert_eq!(
            err.to_string(),
            "Operation not supported: update stream (requires the v1 API dialect)"
        );
    }
}
