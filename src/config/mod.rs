pub mod types;

use std::path::{Path, PathBuf};

use crate::error::{ForkyardError, Result};
use types::ForkyardConfig;

/// Load config from the given path, or the XDG path when none is given.
/// A missing file yields defaults; environment overrides are applied last.
pub fn load_config(path: Option<&Path>) -> Result<ForkyardConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let mut cfg = if path.exists() {
        let raw = std::fs::read_to_string(&path).map_err(|e| ForkyardError::Io {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&raw)
            .map_err(|e| ForkyardError::Config(format!("{}: {}", path.display(), e)))?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        ForkyardConfig::default()
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Fill credentials and identity from the environment.
fn apply_env_overrides(cfg: &mut ForkyardConfig, var: impl Fn(&str) -> Option<String>) {
    if cfg.github.token.as_deref().is_none_or(str::is_empty) {
        cfg.github.token = var("FORKYARD_GITHUB_TOKEN")
            .or_else(|| var("GITHUB_TOKEN"))
            .filter(|t| !t.is_empty());
    }
    if let Some(username) = var("FORKYARD_GITHUB_USERNAME").filter(|u| !u.is_empty()) {
        cfg.github.username = username;
    }
}

/// Return XDG config dir (~/.config/forkyard/)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("forkyard")
}

/// Return the default config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}
