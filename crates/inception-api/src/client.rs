// Panel HTTP client
//
// Wraps `reqwest::Client` with API-root URL construction, credential
// injection, the single 401 retry, and response status handling. Endpoint
// paths come from the dialect; long-poll and stream live in their own
// modules as inherent methods / companion types.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthMethod;
use crate::dialect::ApiDialect;
use crate::error::{Error, preview};
use crate::models::{
    AreaControl, AreaId, AreaStateBody, AreaSummary, ControlRequest, RawAreaState,
    StatusIndicators,
};
use crate::session::SessionManager;
use crate::transport::TransportConfig;

/// Raw HTTP client for the panel REST API.
///
/// Every data call goes through [`send`](Self::send), which attaches the
/// live credential and retries exactly once after re-authenticating when
/// the panel answers 401.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Url,
    dialect: ApiDialect,
    session: Arc<SessionManager>,
    transport: TransportConfig,
}

impl PanelClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the panel root (e.g. `https://192.168.1.50`); the
    /// `api/v1/` prefix is appended unless already present.
    pub fn new(
        base_url: &Url,
        dialect: ApiDialect,
        auth: AuthMethod,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, dialect, auth, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &Url,
        dialect: ApiDialect,
        auth: AuthMethod,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = api_root(base_url)?;
        let login_url = base_url.join(dialect.login_path())?;
        let session = Arc::new(SessionManager::new(http.clone(), login_url, auth));
        Ok(Self {
            http,
            base_url,
            dialect,
            session,
            transport: transport.clone(),
        })
    }

    /// The API root every endpoint path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn dialect(&self) -> ApiDialect {
        self.dialect
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build a full URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Send a request with the live credential, retrying once on 401.
    ///
    /// `build` is called once per attempt so the request can be rebuilt
    /// with the refreshed credential.
    pub(crate) async fn send<F>(&self, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let credential = self.session.credential().await?;
        let resp = credential.apply(build(&self.http)).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        warn!("panel rejected credential, re-authenticating");
        let credential = self.session.refresh_after_rejection(&credential).await?;
        let resp = credential.apply(build(&self.http)).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(Error::Unauthorized);
        }
        Ok(resp)
    }

    /// Read a response body, mapping non-success statuses to errors.
    ///
    /// Returns `None` for 204 and for an empty body.
    pub(crate) async fn read_body(resp: reqwest::Response) -> Result<Option<String>, Error> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }

    pub(crate) fn parse<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(body)),
            body: body.to_owned(),
        })
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List every area the panel exposes, in panel order.
    pub async fn list_areas(&self) -> Result<Vec<AreaSummary>, Error> {
        let url = self.url(self.dialect.areas_path())?;
        debug!("GET {}", url);

        let resp = self.send(|http| http.get(url.clone())).await?;
        match Self::read_body(resp).await? {
            Some(body) => Self::parse(&body),
            None => Ok(Vec::new()),
        }
    }

    /// Fetch the raw state of one area.
    ///
    /// `Ok(None)` means the panel answered with no body.
    pub async fn area_state(&self, id: &AreaId) -> Result<Option<RawAreaState>, Error> {
        let url = self.url(&self.dialect.area_state_path(id))?;
        debug!("GET {}", url);

        let resp = self.send(|http| http.get(url.clone())).await?;
        let Some(body) = Self::read_body(resp).await? else {
            return Ok(None);
        };

        let parsed: AreaStateBody = Self::parse(&body)?;
        parsed
            .state
            .raw()
            .map(Some)
            .ok_or_else(|| Error::Deserialization {
                message: "area state body carries no state field".into(),
                body,
            })
    }

    /// Issue an area command.
    ///
    /// Succeeds only when the body carries an explicit success indicator.
    pub async fn control_area(&self, id: &AreaId, control: AreaControl) -> Result<(), Error> {
        let url = self.url(&self.dialect.area_activity_path(id))?;
        let request = ControlRequest {
            kind: "ControlArea",
            control: self.dialect.control_token(control),
        };
        debug!(area_id = %id, control = request.control, "POST {}", url);

        let resp = self
            .send(|http| http.post(url.clone()).json(&request))
            .await?;
        let body = Self::read_body(resp).await?.unwrap_or_default();

        let indicators: StatusIndicators = serde_json::from_str(&body).unwrap_or_default();
        match indicators.outcome() {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => Err(Error::Rejected { message }),
            None => Err(Error::Rejected {
                message: format!("no success indicator in response: {:?}", preview(&body)),
            }),
        }
    }
}

/// Normalize a panel URL to its `api/v1/` root.
fn api_root(base: &Url) -> Result<Url, Error> {
    let trimmed = base.as_str().trim_end_matches('/');
    let root = if trimmed.ends_with("/api/v1") {
        format!("{trimmed}/")
    } else {
        format!("{trimmed}/api/v1/")
    };
    Ok(Url::parse(&root)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_root_appends_prefix_once() {
        let bare = Url::parse("https://panel.local").unwrap();
        assert_eq!(api_root(&bare).unwrap().as_str(), "https://panel.local/api/v1/");

        let full = Url::parse("http://10.0.0.5:8080/api/v1").unwrap();
        assert_eq!(api_root(&full).unwrap().as_str(), "http://10.0.0.5:8080/api/v1/");
    }

    #[test]
    fn endpoint_paths_join_under_root() {
        let root = api_root(&Url::parse("https://panel.local/").unwrap()).unwrap();
        let url = root
            .join(&ApiDialect::V1.area_state_path(&AreaId::from("7")))
            .unwrap();
        assert_eq!(url.as_str(), "https://panel.local/api/v1/control/area/7/state");
    }
}
