//! Clap derive structures for the `inception` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use inception_core::TargetState;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// inception -- watch and control one area of a security panel
#[derive(Debug, Parser)]
#[command(
    name = "inception",
    version,
    about = "Bridge a security panel area to the command line",
    long_about = "Keeps one panel area's arming state in sync and issues arm/disarm\n\
        commands against it, over polling, long-poll, or a WebSocket stream.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file
    #[arg(long, env = "INCEPTION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Panel host or address, optionally with :port (overrides config)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Area name, or 0-based position in the panel's list (overrides config)
    ///
    /// A value made only of digits is always a position; use --area-name
    /// for an area whose name is a number.
    #[arg(long, short = 'a', global = true)]
    pub area: Option<String>,

    /// Area name, taken literally even when it is all digits
    #[arg(long, global = true, conflicts_with = "area", value_name = "NAME")]
    pub area_name: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table or line
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Target arming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// Arm with everyone away
    Away,
    /// Arm perimeter, occupants home
    Stay,
    /// Arm for the night
    Night,
    /// Disarm
    Off,
}

impl From<TargetArg> for TargetState {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Away => Self::Away,
            TargetArg::Stay => Self::Stay,
            TargetArg::Night => Self::Night,
            TargetArg::Off => Self::Off,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the area and log every state change until Ctrl-C
    Run,

    /// Show the area's current state
    Status,

    /// Move the area to a new arming state
    Set {
        /// Target state
        target: TargetArg,
    },

    /// List the panel's areas
    Areas,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn area_and_area_name_conflict() {
        let err = Cli::try_parse_from(["inception", "--area", "1", "--area-name", "1", "status"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn set_parses_target() {
        let cli = Cli::try_parse_from(["inception", "set", "night"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Set {
                target: TargetArg::Night
            }
        ));
    }
}
