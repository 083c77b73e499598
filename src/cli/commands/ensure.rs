use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::output;
use crate::cli::{OutputFormat, Session};
use forkyard::core::manager::{EnsureEvent, EnsureMode, EnsureReport};

#[derive(clap::Args)]
pub struct EnsureArgs {
    /// Repositories to reconcile, as listed (controllers carry the
    /// -controller suffix). Defaults to every configured repository.
    pub names: Vec<String>,

    /// Keep reconciling after a repository fails and report all failures
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    succeeded: &'a [String],
    failed: Vec<FailureEntry<'a>>,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
    name: &'a str,
    error: String,
}

pub fn run(args: EnsureArgs, session: &Session) -> anyhow::Result<()> {
    let mut manager = session.manager()?;
    let ctx = session.context();
    let mode = if args.keep_going {
        EnsureMode::KeepGoing
    } else {
        EnsureMode::FailFast
    };

    let total = if args.names.is_empty() {
        manager.repositories().len()
    } else {
        args.names.len()
    };
    let bar = progress_bar(total as u64, session.format);
    let on_event = |event: EnsureEvent| match event {
        EnsureEvent::Started(name) => bar.set_message(name.to_string()),
        EnsureEvent::Finished { name, ok } => {
            if !ok {
                bar.println(format!("{} {}", "✗".red(), name));
            }
            bar.inc(1);
        }
    };

    let result = if args.names.is_empty() {
        manager.ensure_all_with(&ctx, mode, Some(&on_event))
    } else {
        manager.ensure_named_with(&ctx, &args.names, mode, Some(&on_event))
    };
    bar.finish_and_clear();

    let report = result?;
    print_report(&report, session.format)?;
    report.into_result()?;
    Ok(())
}

fn progress_bar(len: u64, format: OutputFormat) -> ProgressBar {
    if format != OutputFormat::Human || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}") {
        bar.set_style(style);
    }
    bar
}

fn print_report(report: &EnsureReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            for name in &report.succeeded {
                println!("{} {}", "✓".green(), name);
            }
            for failure in &report.failed {
                println!("{} {}: {}", "✗".red(), failure.name, failure.error);
            }
            println!(
                "{} reconciled, {} failed",
                report.succeeded.len(),
                report.failed.len()
            );
        }
        format => {
            let summary = Summary {
                succeeded: &report.succeeded,
                failed: report
                    .failed
                    .iter()
                    .map(|f| FailureEntry {
                        name: &f.name,
                        error: f.error.to_string(),
                    })
                    .collect(),
            };
            output::output_value(&summary, format, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}
