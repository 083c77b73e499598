pub mod commands;
pub mod display;
pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use forkyard::config::{self, types::ForkyardConfig};
use forkyard::core::context::RunContext;
use forkyard::core::manager::Manager;

#[derive(Parser)]
#[command(
    name = "forkyard",
    about = "Keep your organization forks and local clones in line.",
    version
)]
pub struct Cli {
    /// Config file (default: ~/.config/forkyard/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Give up on the whole run after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured repositories
    List(commands::list::ListArgs),
    /// Fork and clone repositories that are missing
    Ensure(commands::ensure::EnsureArgs),
    /// Show current configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Settings shared by every command.
pub struct Session {
    pub config: ForkyardConfig,
    pub format: OutputFormat,
    timeout: Option<Duration>,
}

impl Session {
    /// Manager with every configured repository loaded.
    pub fn manager(&self) -> anyhow::Result<Manager> {
        let mut manager = Manager::from_config(&self.config)?;
        manager.load_all()?;
        Ok(manager)
    }

    /// Run context honoring `--timeout`, cancelled by Ctrl-C.
    pub fn context(&self) -> RunContext {
        let ctx = match self.timeout {
            Some(timeout) => RunContext::with_timeout(timeout),
            None => RunContext::new(),
        };
        cancel_on_ctrl_c(&ctx);
        ctx
    }
}

/// The first Ctrl-C cancels `ctx`, so an interrupted clone still removes its
/// partial directory. A second Ctrl-C exits at once.
fn cancel_on_ctrl_c(ctx: &RunContext) {
    let handle = ctx.cancel_handle();
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("ctrl-c handler unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("ctrl-c handler failed: {}", e);
                    return;
                }
                tracing::warn!("interrupted, stopping after the current step");
                handle.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!("ctrl-c handler unavailable: {}", e);
    }
}

/// Dispatch a CLI command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let session = Session {
        config: config::load_config(cli.config.as_deref())?,
        format: cli.format,
        timeout: cli.timeout.map(Duration::from_secs),
    };

    match command {
        Commands::List(args) => commands::list::run(args, &session),
        Commands::Ensure(args) => commands::ensure::run(args, &session),
        Commands::Config => commands::config::run(&session),
    }
}
