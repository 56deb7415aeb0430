//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use inception_config::ConfigError;
use inception_core::{CommandError, CoreError, ResolveError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the panel at {url}")]
    #[diagnostic(
        code(inception::connection_failed),
        help(
            "Check that the panel is powered and reachable.\n\
             Self-signed certificate? Try: inception status --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Panel request timed out after {seconds}s")]
    #[diagnostic(
        code(inception::timeout),
        help("Raise panel.timeout in the config, or check panel responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(inception::auth_failed),
        help(
            "Verify the API token or username/password for the panel.\n\
             Secrets resolve from auth.*_env, then the keyring, then the file."
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for '{name}'")]
    #[diagnostic(
        code(inception::no_credentials),
        help(
            "Set auth.api_token (or auth.username and auth.password) in the config,\n\
             or export INCEPTION_AUTH__API_TOKEN."
        )
    )]
    NoCredentials { name: String },

    // ── Areas ────────────────────────────────────────────────────────
    #[error("Area {selector} not found")]
    #[diagnostic(
        code(inception::area_not_found),
        help("Run: inception areas to see the panel's areas")
    )]
    AreaNotFound { selector: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Panel rejected the command: {message}")]
    #[diagnostic(
        code(inception::rejected),
        help("The panel refuses to arm while inputs are open or a fault is active.")
    )]
    Rejected { message: String },

    #[error("Operation not supported: {message}")]
    #[diagnostic(code(inception::unsupported))]
    Unsupported { message: String },

    // ── Panel ────────────────────────────────────────────────────────
    #[error("Panel error: {message}")]
    #[diagnostic(code(inception::api_error))]
    Api { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(inception::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(inception::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::AreaNotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Api { .. } | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { name, .. } => Self::NoCredentials { name },
            ConfigError::Figment(e) => Self::Config(e),
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Resolve(e) => e.into(),
            CoreError::Command(e) => e.into(),
            CoreError::Unsupported {
                operation,
                required,
            } => Self::Unsupported {
                message: format!("{operation} (requires {required})"),
            },
            CoreError::Api { message, .. } => Self::Api { message },
            CoreError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}

impl From<ResolveError> for CliError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::IndexOutOfRange { index, len } => Self::AreaNotFound {
                selector: format!("#{index} (panel has {len} areas)"),
            },
            ResolveError::NotFound { name } => Self::AreaNotFound {
                selector: format!("{name:?}"),
            },
            ResolveError::Api(e) => CoreError::from(e).into(),
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Rejected { message } => Self::Rejected { message },
            CommandError::Api(e) => CoreError::from(e).into(),
            e @ (CommandError::AreaUnresolved | CommandError::Unavailable) => Self::Api {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_command_exits_6() {
        let err = CliError::from(CoreError::Command(CommandError::Rejected {
            message: "Inputs open".into(),
        }));
        assert_eq!(err.exit_code(), exit_code::REJECTED);
    }

    #[test]
    fn unknown_area_exits_4() {
        let err = CliError::from(CoreError::Resolve(ResolveError::NotFound {
            name: "Garage".into(),
        }));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn auth_failure_exits_3() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "bad token".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn config_validation_exits_2() {
        let err = CliError::from(ConfigError::Validation {
            field: "panel.host".into(),
            reason: "must be set".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFIG);
    }
}
