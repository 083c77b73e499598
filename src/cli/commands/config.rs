use crate::cli::output;
use crate::cli::{OutputFormat, Session};

pub fn run(session: &Session) -> anyhow::Result<()> {
    let cfg = session.config.redacted();

    match session.format {
        OutputFormat::Human => {
            let toml_str = toml::to_string_pretty(&cfg)?;
            println!("{}", toml_str);
        }
        format => output::output_value(&cfg, format, &mut std::io::stdout().lock())?,
    }

    Ok(())
}
