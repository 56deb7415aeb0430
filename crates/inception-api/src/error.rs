use thiserror::Error;

/// Why a login attempt did not produce a credential.
///
/// Kept separate from [`Error`] so the session manager's contract stays
/// narrow: network failure, explicit rejection, or an unusable response.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login request never got an answer (DNS, refused, timeout, TLS).
    #[error("login request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// The panel answered but refused the credentials.
    #[error("login rejected: {message}")]
    Rejected { message: String },

    /// The panel answered success but the credential could not be extracted.
    #[error("login response malformed: {message}")]
    MalformedResponse { message: String },
}

/// Top-level error type for the `inception-api` crate.
///
/// Covers every failure mode across the REST and WebSocket surfaces.
/// `inception-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Obtaining a credential failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The panel still answered 401 after one re-authentication.
    #[error("Credential rejected by panel after re-authentication")]
    Unauthorized,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request or handshake did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Panel responses ─────────────────────────────────────────────
    /// Non-success HTTP status other than 401.
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The panel answered HTTP 200 but reported failure in the body.
    #[error("Panel rejected request: {message}")]
    Rejected { message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the panel with a close frame.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Dialect ─────────────────────────────────────────────────────
    /// Operation not offered by the selected API dialect.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl Error {
    /// Returns `true` if this error indicates the credential is no longer
    /// accepted and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Auth(AuthError::Rejected { .. }))
    }

    /// Returns `true` if this is a transient transport error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Auth(AuthError::Network(_)) | Self::Timeout(_) | Self::WebSocketConnect(_) => {
                true
            }
            Self::WebSocketClosed { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the panel answered with a body we could not use.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Deserialization { .. } | Self::Auth(AuthError::MalformedResponse { .. })
        )
    }
}

/// Truncate a response body for inclusion in error messages.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
