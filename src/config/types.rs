use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ORGANIZATION: &str = "aws-controllers-k8s";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkyardConfig {
    pub root_directory: PathBuf,
    pub repositories: RepositoriesConfig,
    pub github: GithubConfig,
    pub git: GitConfig,
}

impl Default for ForkyardConfig {
    fn default() -> Self {
        Self {
            root_directory: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("source")
                .join("forkyard"),
            repositories: RepositoriesConfig::default(),
            github: GithubConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl ForkyardConfig {
    /// Copy of this config that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.github.token.as_deref().is_some_and(|t| !t.is_empty()) {
            cfg.github.token = Some("********".into());
        }
        cfg
    }
}

/// Declared repositories, by base name. Controller names are listed without
/// the `-controller` suffix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoriesConfig {
    pub core: Vec<String>,
    pub tooling: Vec<String>,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub fork_prefix: String,
    pub organization: String,
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            token: None,
            fork_prefix: String::new(),
            organization: DEFAULT_ORGANIZATION.into(),
            api_url: "https://api.github.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Private key used for SSH clones. Discovered under `~/.ssh` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<PathBuf>,
    /// Wait after a fork request before renaming the new fork.
    pub fork_grace_period_ms: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            ssh_key_path: None,
            fork_grace_period_ms: 1000,
        }
    }
}
