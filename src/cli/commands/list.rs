use crate::cli::Session;
use crate::cli::display::TableOptions;
use crate::cli::output;
use forkyard::core::filter;

#[derive(clap::Args)]
pub struct ListArgs {
    /// Filter expression, e.g. "type=controller branch=main"
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Show the fork clone URL
    #[arg(long)]
    pub show_url: bool,

    /// Hide the checked out branch
    #[arg(long)]
    pub no_branch: bool,
}

pub fn run(args: ListArgs, session: &Session) -> anyhow::Result<()> {
    let filters = filter::build_filters(&args.filter)?;
    let manager = session.manager()?;
    let repos = manager.list(&filters);

    let opts = TableOptions {
        show_branch: !args.no_branch,
        show_url: args.show_url,
    };
    output::output_repos(&repos, session.format, opts, &mut std::io::stdout().lock())
}
