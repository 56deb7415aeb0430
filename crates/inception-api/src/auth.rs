// Credential model
//
// A credential is an opaque token plus a hint describing how to attach it
// to requests. How it is obtained (static token or login) and how it is
// carried (bearer, cookie, or custom header) are independent choices.

use reqwest::header::{AUTHORIZATION, COOKIE, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// How a credential is attached to outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialTransport {
    /// `Authorization: Bearer <token>`.
    #[default]
    Bearer,
    /// `Cookie: <name>=<token>`.
    Cookie { name: String },
    /// `<name>: <token>`.
    Header { name: String },
}

/// Where a successful login response carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    /// A top-level JSON body field, e.g. `UserID`.
    BodyField { field: String },
    /// A named cookie from the `Set-Cookie` headers.
    SetCookie { name: String },
    /// A named response header.
    Header { name: String },
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::BodyField {
            field: "UserID".into(),
        }
    }
}

/// How the bridge obtains its credential.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// A pre-provisioned API token. Never refreshed; a 401 re-applies it once.
    Token {
        token: SecretString,
        transport: CredentialTransport,
    },
    /// Username/password exchanged for a session credential at login.
    Login {
        username: String,
        password: SecretString,
        source: CredentialSource,
        transport: CredentialTransport,
    },
}

/// A live credential, ready to be applied to a request.
///
/// Immutable once built. Re-authentication produces a new value with a
/// higher `generation`, which lets concurrent callers tell whether the
/// credential they were rejected with has already been replaced.
#[derive(Debug, Clone)]
pub struct Credential {
    name: HeaderName,
    value: HeaderValue,
    generation: u64,
}

impl Credential {
    /// Build a credential from a raw token.
    pub fn new(
        token: &SecretString,
        transport: &CredentialTransport,
        generation: u64,
    ) -> Result<Self, AuthError> {
        let token = token.expose_secret();
        let (name, raw) = match transport {
            CredentialTransport::Bearer => (AUTHORIZATION, format!("Bearer {token}")),
            CredentialTransport::Cookie { name } => (COOKIE, format!("{name}={token}")),
            CredentialTransport::Header { name } => {
                let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    AuthError::MalformedResponse {
                        message: format!("invalid credential header name {name:?}: {e}"),
                    }
                })?;
                (header, token.to_owned())
            }
        };

        let mut value =
            HeaderValue::from_str(&raw).map_err(|_| AuthError::MalformedResponse {
                message: "credential contains characters not allowed in a header".into(),
            })?;
        value.set_sensitive(true);

        Ok(Self {
            name,
            value,
            generation,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Attach this credential to a request.
    pub fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(self.name.clone(), self.value.clone())
    }

    /// Header name/value pair for the WebSocket upgrade request.
    pub(crate) fn header_pair(&self) -> (&str, &str) {
        (self.name.as_str(), self.value.to_str().unwrap_or_default())
    }
}
