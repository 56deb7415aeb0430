//! Output formatting: table or JSON, plus state coloring.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use inception_core::SemanticState;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Color only on an interactive terminal, and never with `NO_COLOR` set.
pub fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Render rows as a table, or the source data as pretty JSON.
///
/// `to_row` receives each item's position in `data`.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(usize, &T) -> R,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().enumerate().map(|(i, d)| to_row(i, d)).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

/// A state label, colored by severity when `color` is set.
pub fn paint_state(state: SemanticState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        SemanticState::Disarmed => label.green().to_string(),
        SemanticState::AlarmTriggered => label.red().bold().to_string(),
        SemanticState::AwayArmed | SemanticState::StayArmed | SemanticState::NightArmed => {
            label.yellow().to_string()
        }
    }
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
