use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::git_ops::LocalRepo;
use crate::error::ForkyardError;

pub const CONTROLLER_SUFFIX: &str = "-controller";

/// Kind of tracked project. Decides suffixing and which configured list
/// a name is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Core,
    Tooling,
    Controller,
    Unknown,
}

impl RepoType {
    pub fn label(&self) -> &'static str {
        match self {
            RepoType::Core => "core",
            RepoType::Tooling => "tooling",
            RepoType::Controller => "controller",
            RepoType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RepoType {
    type Err = ForkyardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "core" => Ok(RepoType::Core),
            "tooling" => Ok(RepoType::Tooling),
            "controller" => Ok(RepoType::Controller),
            _ => Err(ForkyardError::UnknownRepoType(s.to_string())),
        }
    }
}

/// Local clone state of a repository. Only a successful open or clone
/// produces `Cloned`.
#[derive(Default)]
pub enum CloneState {
    #[default]
    NotCloned,
    Cloned(Box<dyn LocalRepo>),
    /// Cloned on disk, but reopening it or registering `upstream` failed.
    Incomplete,
}

impl CloneState {
    pub fn is_cloned(&self) -> bool {
        matches!(self, CloneState::Cloned(_))
    }

    pub fn handle(&self) -> Option<&dyn LocalRepo> {
        match self {
            CloneState::Cloned(handle) => Some(handle.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Debug for CloneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloneState::NotCloned => f.write_str("NotCloned"),
            CloneState::Cloned(_) => f.write_str("Cloned(..)"),
            CloneState::Incomplete => f.write_str("Incomplete"),
        }
    }
}

/// A tracked organization repository, its fork and its local clone.
#[derive(Debug, Serialize)]
pub struct Repository {
    pub name: String,
    #[serde(rename = "type")]
    pub repo_type: RepoType,
    pub full_path: PathBuf,
    /// Current branch or short commit; empty until cloned.
    pub git_head: String,
    /// Fork name on the hosted service. May differ from the expected
    /// prefixed name until the fork is renamed.
    pub fork_name: String,
    pub fork_url: String,
    pub remote_url: String,
    pub upstream_url: String,
    #[serde(rename = "cloned", serialize_with = "serialize_cloned")]
    pub(crate) state: CloneState,
}

fn serialize_cloned<S: Serializer>(state: &CloneState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bool(state.is_cloned())
}

impl Repository {
    /// Create a repository with only `name` and `repo_type` set. Controller
    /// names get the controller suffix.
    pub fn new(name: &str, repo_type: RepoType) -> Self {
        Self {
            name: normalize_name(name, repo_type),
            repo_type,
            full_path: PathBuf::new(),
            git_head: String::new(),
            fork_name: String::new(),
            fork_url: String::new(),
            remote_url: String::new(),
            upstream_url: String::new(),
            state: CloneState::NotCloned,
        }
    }

    pub fn is_cloned(&self) -> bool {
        self.state.is_cloned()
    }

    pub fn clone_state(&self) -> &CloneState {
        &self.state
    }
}

/// Apply the controller suffix for controller repositories.
pub fn normalize_name(name: &str, repo_type: RepoType) -> String {
    match repo_type {
        RepoType::Controller => format!("{}{}", name, CONTROLLER_SUFFIX),
        _ => name.to_string(),
    }
}

/// Expected fork name: `prefix + name`, or `name` without a prefix.
pub fn fork_name(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

/// SSH clone URL for `owner/name` on GitHub.
pub fn remote_url(owner: &str, name: &str) -> String {
    format!("git@github.com:{}/{}.git", owner, name)
}
