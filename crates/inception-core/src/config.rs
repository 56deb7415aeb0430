// ── Runtime bridge configuration ──
//
// Describes how to reach one panel and which area to watch. Carries
// credential data and timing, but never touches disk; inception-config
// builds a `BridgeConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use inception_api::transport::{TlsMode, TransportConfig};
use inception_api::{ApiDialect, AuthMethod, CredentialTransport};

use crate::error::CoreError;
use crate::resolver::AreaSelector;

/// Longest wait the panel accepts for a long-poll request.
pub const MAX_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// How the synchronizer learns about state changes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SyncMode {
    /// One GET per interval.
    #[default]
    Poll,
    /// Back-to-back `monitor-updates` requests.
    LongPoll,
    /// A persistent WebSocket.
    Stream,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Panels ship self-signed certificates.
    DangerAcceptInvalid,
}

/// Configuration for one bridged area.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Panel root URL (e.g. `https://192.168.1.50`).
    pub base_url: Url,
    pub auth: AuthMethod,
    pub area: AreaSelector,
    pub dialect: ApiDialect,
    pub sync_mode: SyncMode,
    pub tls: TlsVerification,
    /// Ordinary request timeout.
    pub timeout: Duration,
    /// How long the panel may hold a long-poll or stream wait.
    pub long_poll_timeout: Duration,
    /// Poll cadence, and the back-off after a failed cycle in every mode.
    pub poll_interval: Duration,
}

impl BridgeConfig {
    /// A config with default timing for a token-authenticated panel.
    pub fn new(base_url: Url, token: SecretString, area: AreaSelector) -> Self {
        Self {
            base_url,
            auth: AuthMethod::Token {
                token,
                transport: CredentialTransport::Bearer,
            },
            area,
            dialect: ApiDialect::default(),
            sync_mode: SyncMode::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            long_poll_timeout: Duration::from_secs(50),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: String| Err(CoreError::Config { message });

        if self.poll_interval.is_zero() {
            return invalid("poll interval must be greater than zero".into());
        }
        if self.timeout.is_zero() {
            return invalid("request timeout must be greater than zero".into());
        }
        if self.long_poll_timeout.is_zero() || self.long_poll_timeout > MAX_LONG_POLL_TIMEOUT {
            return invalid(format!(
                "long-poll timeout must be between 1 and {}s, got {}s",
                MAX_LONG_POLL_TIMEOUT.as_secs(),
                self.long_poll_timeout.as_secs()
            ));
        }
        match self.sync_mode {
            SyncMode::LongPoll if self.dialect.monitor_path().is_none() => invalid(format!(
                "sync mode {} is not available with the {} dialect",
                self.sync_mode, self.dialect
            )),
            SyncMode::Stream if self.dialect.stream_path().is_none() => invalid(format!(
                "sync mode {} is not available with the {} dialect",
                self.sync_mode, self.dialect
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: tls_to_transport(&self.tls),
            timeout: self.timeout,
            long_poll_timeout: self.long_poll_timeout,
        }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
