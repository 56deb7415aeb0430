//! Configuration for the Inception bridge.
//!
//! TOML file + `INCEPTION_` environment overrides, credential resolution
//! (env var, keyring, plaintext), and translation to
//! `inception_core::BridgeConfig`. The binary layers CLI flag overrides on
//! top of what this crate loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use inception_core::{
    ApiDialect, AreaSelector, AuthMethod, BridgeConfig, CredentialSource, CredentialTransport,
    MAX_LONG_POLL_TIMEOUT, SyncMode, TlsVerification,
};

const KEYRING_SERVICE: &str = "inception";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for '{name}' ({mode} auth)")]
    NoCredentials { name: String, mode: AuthMode },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Display name of the bridged accessory; also the keyring account prefix.
    #[serde(default = "default_name")]
    pub name: String,

    /// Area to watch: a name (`"Home"`) or a 0-based position (`0`).
    /// Required by everything except area listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaSelector>,

    #[serde(default)]
    pub panel: PanelSection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub sync: SyncSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            area: None,
            panel: PanelSection::default(),
            auth: AuthSection::default(),
            sync: SyncSection::default(),
        }
    }
}

fn default_name() -> String {
    "Inception".into()
}

/// `[panel]`: how to reach the panel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelSection {
    /// Host name or address, optionally with `:port`.
    #[serde(default)]
    pub host: String,

    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Skip certificate verification (panels ship self-signed certs).
    #[serde(default)]
    pub insecure: bool,

    /// Path to a PEM CA certificate to trust.
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub dialect: ApiDialect,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for PanelSection {
    fn default() -> Self {
        Self {
            host: String::new(),
            scheme: default_scheme(),
            insecure: false,
            ca_cert: None,
            dialect: ApiDialect::default(),
            timeout: default_timeout(),
        }
    }
}

fn default_scheme() -> String {
    "https".into()
}
fn default_timeout() -> u64 {
    10
}

/// How credentials are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Pre-provisioned API token.
    #[default]
    Token,
    /// Username and password exchanged at login.
    Login,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Token => "token",
            Self::Login => "login",
        })
    }
}

/// Where the login response carries the credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    BodyField,
    SetCookie,
    Header,
}

/// How the credential rides on requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Bearer,
    Cookie,
    Header,
}

/// `[auth]`: credentials and how they travel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthSection {
    #[serde(default)]
    pub mode: AuthMode,

    /// API token (plaintext; prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable holding the API token.
    pub api_token_env: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    #[serde(default)]
    pub credential_source: SourceKind,

    /// Body field, cookie or header the login credential is read from.
    pub credential_field: Option<String>,

    #[serde(default)]
    pub credential_transport: TransportKind,

    /// Cookie or header name the credential is sent as.
    pub credential_name: Option<String>,
}

/// `[sync]`: how state changes are observed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default)]
    pub mode: SyncMode,

    /// Poll interval and error back-off, in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// How long the panel may hold a long-poll, in seconds.
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            interval: default_interval(),
            long_poll_timeout: default_long_poll_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    5
}
fn default_long_poll_timeout() -> u64 {
    50
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "inception", "inception").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("inception");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from defaults, the TOML file, and the environment.
///
/// `path` overrides the platform config location. A missing file is not
/// an error; the defaults and environment still apply. Nested keys use a
/// double underscore: `INCEPTION_PANEL__HOST`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("INCEPTION_").split("__"));

    Ok(figment.extract()?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a secret: named env var, then keyring, then plaintext.
fn resolve_secret(
    env_name: Option<&str>,
    keyring_account: &str,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            debug!(env = env_name, "secret taken from environment");
            return Some(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, keyring_account) {
        if let Ok(secret) = entry.get_password() {
            debug!(account = keyring_account, "secret taken from keyring");
            return Some(SecretString::from(secret));
        }
    }

    plaintext.map(|s| SecretString::from(s.to_owned()))
}

fn credential_source(auth: &AuthSection) -> Result<CredentialSource, ConfigError> {
    let named = |kind: &str| {
        auth.credential_field
            .clone()
            .ok_or_else(|| invalid("auth.credential_field", format!("required for {kind}")))
    };
    Ok(match auth.credential_source {
        SourceKind::BodyField => CredentialSource::BodyField {
            field: auth
                .credential_field
                .clone()
                .unwrap_or_else(|| "UserID".into()),
        },
        SourceKind::SetCookie => CredentialSource::SetCookie {
            name: named("set_cookie")?,
        },
        SourceKind::Header => CredentialSource::Header {
            name: named("header")?,
        },
    })
}

fn credential_transport(auth: &AuthSection) -> Result<CredentialTransport, ConfigError> {
    let named = |kind: &str| {
        auth.credential_name
            .clone()
            .ok_or_else(|| invalid("auth.credential_name", format!("required for {kind}")))
    };
    Ok(match auth.credential_transport {
        TransportKind::Bearer => CredentialTransport::Bearer,
        TransportKind::Cookie => CredentialTransport::Cookie {
            name: named("cookie")?,
        },
        TransportKind::Header => CredentialTransport::Header {
            name: named("header")?,
        },
    })
}

/// Resolve the `[auth]` section into an `AuthMethod`.
pub fn resolve_auth(cfg: &Config) -> Result<AuthMethod, ConfigError> {
    let auth = &cfg.auth;
    let transport = credential_transport(auth)?;
    let missing = || ConfigError::NoCredentials {
        name: cfg.name.clone(),
        mode: auth.mode,
    };

    match auth.mode {
        AuthMode::Token => {
            let token = resolve_secret(
                auth.api_token_env.as_deref(),
                &format!("{}/api-token", cfg.name),
                auth.api_token.as_deref(),
            )
            .ok_or_else(missing)?;
            Ok(AuthMethod::Token { token, transport })
        }
        AuthMode::Login => {
            let username = auth.username.clone().ok_or_else(missing)?;
            let password = resolve_secret(
                auth.password_env.as_deref(),
                &format!("{}/password", cfg.name),
                auth.password.as_deref(),
            )
            .ok_or_else(missing)?;
            Ok(AuthMethod::Login {
                username,
                password,
                source: credential_source(auth)?,
                transport,
            })
        }
    }
}

// ── Translation ─────────────────────────────────────────────────────

/// The panel root URL built from `scheme` and `host`.
pub fn panel_url(panel: &PanelSection) -> Result<Url, ConfigError> {
    let host = panel.host.trim();
    if host.is_empty() {
        return Err(invalid("panel.host", "must be set"));
    }
    if host.contains("://") || host.contains('/') {
        return Err(invalid(
            "panel.host",
            format!("expected a host name or address without scheme or path, got {host:?}"),
        ));
    }
    if !matches!(panel.scheme.as_str(), "http" | "https") {
        return Err(invalid(
            "panel.scheme",
            format!("expected 'http' or 'https', got '{}'", panel.scheme),
        ));
    }

    Url::parse(&format!("{}://{host}", panel.scheme))
        .map_err(|e| invalid("panel.host", format!("{host:?}: {e}")))
}

/// Build a validated `BridgeConfig`.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let base_url = panel_url(&cfg.panel)?;
    let area = cfg
        .area
        .clone()
        .ok_or_else(|| invalid("area", "must be set to an area name or 0-based position"))?;
    let auth = resolve_auth(cfg)?;

    let tls = if cfg.panel.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.panel.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let long_poll_timeout = Duration::from_secs(cfg.sync.long_poll_timeout);
    if long_poll_timeout > MAX_LONG_POLL_TIMEOUT {
        return Err(invalid(
            "sync.long_poll_timeout",
            format!(
                "at most {}s, got {}s",
                MAX_LONG_POLL_TIMEOUT.as_secs(),
                cfg.sync.long_poll_timeout
            ),
        ));
    }

    let bridge = BridgeConfig {
        base_url,
        auth,
        area,
        dialect: cfg.panel.dialect,
        sync_mode: cfg.sync.mode,
        tls,
        timeout: Duration::from_secs(cfg.panel.timeout),
        long_poll_timeout,
        poll_interval: Duration::from_secs(cfg.sync.interval),
    };
    bridge
        .validate()
        .map_err(|e| invalid("configuration", e.to_string()))?;
    Ok(bridge)
}
