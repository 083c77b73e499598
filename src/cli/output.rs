use std::io::{IsTerminal, Write};

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::cli::display::{self, TableOptions};
use forkyard::core::repo::Repository;

/// Write repos in the requested output format.
pub fn output_repos(
    repos: &[&Repository],
    format: OutputFormat,
    opts: TableOptions,
    writer: &mut dyn Write,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", display::render_table(repos, opts, use_color()))?;
            Ok(())
        }
        _ => output_value(repos, format, writer),
    }
}

/// Write any serializable value as JSON or YAML. Human output falls back to JSON.
pub fn output_value<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_writer(&mut *writer, value)?,
        OutputFormat::Json | OutputFormat::Human => {
            serde_json::to_writer_pretty(&mut *writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// Colors only on a terminal, and never with `NO_COLOR` set.
pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}
