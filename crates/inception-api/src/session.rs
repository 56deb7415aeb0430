// Session management
//
// Owns the single live credential. Login requests are serialized behind a
// mutex and tagged with a generation so concurrent 401s trigger one login.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthMethod, Credential, CredentialSource};
use crate::error::{AuthError, preview};
use crate::models::StatusIndicators;

/// Holds the current credential and knows how to obtain a new one.
pub struct SessionManager {
    http: reqwest::Client,
    login_url: Url,
    method: AuthMethod,
    current: ArcSwapOption<Credential>,
    login_lock: Mutex<()>,
    generation: AtomicU64,
}

impl SessionManager {
    pub fn new(http: reqwest::Client, login_url: Url, method: AuthMethod) -> Self {
        Self {
            http,
            login_url,
            method,
            current: ArcSwapOption::empty(),
            login_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Obtain a fresh credential and make it the live one.
    pub async fn authenticate(&self) -> Result<Arc<Credential>, AuthError> {
        let _guard = self.login_lock.lock().await;
        self.authenticate_locked().await
    }

    /// Drop the live credential. The next data call logs in again.
    pub fn invalidate(&self) {
        if self.current.swap(None).is_some() {
            debug!("credential invalidated");
        }
    }

    /// Whether a credential is currently held.
    pub fn is_valid(&self) -> bool {
        self.current.load().is_some()
    }

    /// The live credential, logging in first if there is none.
    pub async fn credential(&self) -> Result<Arc<Credential>, AuthError> {
        if let Some(cred) = self.current.load_full() {
            return Ok(cred);
        }

        let _guard = self.login_lock.lock().await;
        // Another caller may have logged in while we waited.
        if let Some(cred) = self.current.load_full() {
            return Ok(cred);
        }
        self.authenticate_locked().await
    }

    /// Replace a credential the panel just rejected.
    ///
    /// If another caller already replaced it, the newer credential is
    /// returned without a second login.
    pub async fn refresh_after_rejection(
        &self,
        rejected: &Credential,
    ) -> Result<Arc<Credential>, AuthError> {
        let _guard = self.login_lock.lock().await;

        if let Some(cred) = self.current.load_full() {
            if cred.generation() > rejected.generation() {
                debug!(
                    generation = cred.generation(),
                    "credential already refreshed by another caller"
                );
                return Ok(cred);
            }
        }

        self.invalidate();
        self.authenticate_locked().await
    }

    async fn authenticate_locked(&self) -> Result<Arc<Credential>, AuthError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let credential = match &self.method {
            AuthMethod::Token { token, transport } => {
                debug!("using static API token");
                Credential::new(token, transport, generation)?
            }
            AuthMethod::Login {
                username,
                password,
                source,
                transport,
            } => {
                let token = self.login(username, password, source).await?;
                Credential::new(&token, transport, generation)?
            }
        };

        let credential = Arc::new(credential);
        self.current.store(Some(Arc::clone(&credential)));
        info!(generation, "authenticated with panel");
        Ok(credential)
    }

    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        source: &CredentialSource,
    ) -> Result<SecretString, AuthError> {
        debug!("logging in at {}", self.login_url);

        let body = json!({
            "Username": username,
            "Password": password.expose_secret(),
        });

        let resp = self
            .http
            .post(self.login_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(AuthError::Network)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "login refused");
            return Err(AuthError::Rejected {
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        // Cookies and headers must be captured before the body consumes `resp`.
        let from_headers = match source {
            CredentialSource::SetCookie { name } => resp
                .cookies()
                .find(|c| c.name() == name)
                .map(|c| c.value().to_owned()),
            CredentialSource::Header { name } => resp
                .headers()
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            CredentialSource::BodyField { .. } => None,
        };

        let text = resp.text().await.map_err(AuthError::Network)?;
        let parsed: Option<serde_json::Value> = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };

        if let Some(ref value) = parsed {
            let indicators: StatusIndicators =
                serde_json::from_value(value.clone()).unwrap_or_default();
            if let Some(ref status) = indicators.response {
                if !status.is_success() {
                    return Err(AuthError::Rejected {
                        message: status
                            .message
                            .clone()
                            .unwrap_or_else(|| format!("Result={}", status.result)),
                    });
                }
            }
        }

        let token = match source {
            CredentialSource::BodyField { field } => {
                let value = parsed.ok_or_else(|| AuthError::MalformedResponse {
                    message: format!("login body is not JSON: {}", preview(&text)),
                })?;
                match value.get(field.as_str()) {
                    Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
                    Some(serde_json::Value::Number(n)) => n.to_string(),
                    _ => {
                        return Err(AuthError::MalformedResponse {
                            message: format!("login body has no `{field}` field"),
                        });
                    }
                }
            }
            CredentialSource::SetCookie { name } => {
                from_headers.ok_or_else(|| AuthError::MalformedResponse {
                    message: format!("login response set no `{name}` cookie"),
                })?
            }
            CredentialSource::Header { name } => {
                from_headers.ok_or_else(|| AuthError::MalformedResponse {
                    message: format!("login response has no `{name}` header"),
                })?
            }
        };

        debug!("login successful");
        Ok(SecretString::from(token))
    }
}
