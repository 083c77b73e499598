//! In-memory capability fakes for manager tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use super::context::RunContext;
use super::git_ops::{LocalRepo, Vcs};
use super::github::{ForkInfo, HostedService, Owner, RepositoryMetadata};
use super::manager::ManagerSettings;
use crate::error::{ForkyardError, Result};

pub fn settings(core: &[&str], services: &[&str]) -> ManagerSettings {
    ManagerSettings {
        root_directory: PathBuf::from("/work"),
        core: core.iter().map(|s| s.to_string()).collect(),
        tooling: Vec::new(),
        services: services.iter().map(|s| s.to_string()).collect(),
        username: "ada".into(),
        organization: "org".into(),
        fork_prefix: "ack-".into(),
        fork_grace_period: Duration::ZERO,
    }
}

type Remotes = Rc<RefCell<BTreeMap<String, String>>>;

struct FakeHandle {
    head: String,
    remotes: Remotes,
}

impl LocalRepo for FakeHandle {
    fn head_shorthand(&self) -> Result<String> {
        Ok(self.head.clone())
    }

    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        Ok(self.remotes.borrow().get(name).cloned())
    }

    fn create_remote(&self, name: &str, url: &str) -> Result<()> {
        self.remotes.borrow_mut().insert(name.into(), url.into());
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub enum CloneFailure {
    Auth,
    Network,
}

#[derive(Default)]
struct VcsState {
    repos: HashMap<PathBuf, (String, Remotes)>,
    open_errors: HashSet<PathBuf>,
    clone_failure: Option<CloneFailure>,
    clones: Vec<(String, PathBuf)>,
}

/// Fake [`Vcs`]; clones of this value share state.
#[derive(Clone, Default)]
pub struct FakeVcs(Rc<RefCell<VcsState>>);

impl FakeVcs {
    pub fn with_repo(self, path: impl Into<PathBuf>, head: &str) -> Self {
        self.0
            .borrow_mut()
            .repos
            .insert(path.into(), (head.into(), Remotes::default()));
        self
    }

    pub fn fail_open(&self, path: impl Into<PathBuf>) {
        self.0.borrow_mut().open_errors.insert(path.into());
    }

    pub fn allow_open(&self, path: &Path) {
        self.0.borrow_mut().open_errors.remove(path);
    }

    pub fn fail_clone(&self, failure: CloneFailure) {
        self.0.borrow_mut().clone_failure = Some(failure);
    }

    pub fn clones(&self) -> Vec<(String, PathBuf)> {
        self.0.borrow().clones.clone()
    }

    pub fn remotes(&self, path: &Path) -> BTreeMap<String, String> {
        self.0
            .borrow()
            .repos
            .get(path)
            .map(|(_, remotes)| remotes.borrow().clone())
            .unwrap_or_default()
    }
}

impl Vcs for FakeVcs {
    fn open(&self, path: &Path) -> Result<Option<Box<dyn LocalRepo>>> {
        let state = self.0.borrow();
        if state.open_errors.contains(path) {
            return Err(ForkyardError::Git {
                path: path.to_path_buf(),
                source: git2::Error::from_str("corrupt repository"),
            });
        }
        Ok(state.repos.get(path).map(|(head, remotes)| {
            Box::new(FakeHandle {
                head: head.clone(),
                remotes: Rc::clone(remotes),
            }) as Box<dyn LocalRepo>
        }))
    }

    fn clone_repo(&self, ctx: &RunContext, url: &str, dest: &Path) -> Result<()> {
        ctx.check()?;
        let mut state = self.0.borrow_mut();
        state.clones.push((url.into(), dest.to_path_buf()));
        match state.clone_failure {
            Some(CloneFailure::Auth) => Err(ForkyardError::AuthenticationRequired { url: url.into() }),
            Some(CloneFailure::Network) => Err(ForkyardError::Git {
                path: dest.to_path_buf(),
                source: git2::Error::from_str("connection reset"),
            }),
            None => {
                let remotes = Remotes::default();
                remotes.borrow_mut().insert("origin".into(), url.into());
                state.repos.insert(dest.to_path_buf(), ("main".into(), remotes));
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedCall {
    Fork(String),
    Rename {
        owner: String,
        name: String,
        new_name: String,
    },
    LookupFork(String),
}

#[derive(Default)]
struct HostedState {
    /// Upstream repo name to the user's fork of it.
    forks: HashMap<String, ForkInfo>,
    failing_lookups: HashSet<String>,
    calls: Vec<HostedCall>,
}

/// Fake [`HostedService`] for user `ada`; clones of this value share state.
#[derive(Clone, Default)]
pub struct FakeHosted(Rc<RefCell<HostedState>>);

impl FakeHosted {
    pub fn with_fork(self, upstream: &str, fork_name: &str) -> Self {
        self.0.borrow_mut().forks.insert(
            upstream.into(),
            ForkInfo {
                name: fork_name.into(),
                owner: "ada".into(),
            },
        );
        self
    }

    pub fn fail_lookup(&self, upstream: &str) {
        self.0.borrow_mut().failing_lookups.insert(upstream.into());
    }

    pub fn calls(&self) -> Vec<HostedCall> {
        self.0.borrow().calls.clone()
    }

    pub fn mutating_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, HostedCall::LookupFork(_)))
            .count()
    }

    pub fn fork_of(&self, upstream: &str) -> Option<ForkInfo> {
        self.0.borrow().forks.get(upstream).cloned()
    }
}

impl HostedService for FakeHosted {
    fn fork_repository(&self, ctx: &RunContext, repo: &str) -> Result<()> {
        ctx.check()?;
        let mut state = self.0.borrow_mut();
        state.calls.push(HostedCall::Fork(repo.into()));
        state.forks.insert(
            repo.into(),
            ForkInfo {
                name: repo.into(),
                owner: "ada".into(),
            },
        );
        Ok(())
    }

    fn rename_repository(
        &self,
        ctx: &RunContext,
        owner: &str,
        name: &str,
        new_name: &str,
    ) -> Result<()> {
        ctx.check()?;
        let mut state = self.0.borrow_mut();
        state.calls.push(HostedCall::Rename {
            owner: owner.into(),
            name: name.into(),
            new_name: new_name.into(),
        });
        let fork = state
            .forks
            .values_mut()
            .find(|f| f.owner == owner && f.name == name)
            .ok_or_else(|| ForkyardError::GithubApi {
                status: 404,
                url: format!("/repos/{}/{}", owner, name),
                message: "Not Found".into(),
            })?;
        fork.name = new_name.into();
        Ok(())
    }

    fn get_repository(
        &self,
        _ctx: &RunContext,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryMetadata> {
        self.0
            .borrow()
            .forks
            .values()
            .find(|f| f.owner == owner && f.name == name)
            .map(|f| RepositoryMetadata {
                name: f.name.clone(),
                full_name: format!("{}/{}", f.owner, f.name),
                owner: Owner {
                    login: f.owner.clone(),
                },
                fork: true,
                ssh_url: String::new(),
                default_branch: None,
                parent: None,
            })
            .ok_or_else(|| ForkyardError::GithubApi {
                status: 404,
                url: format!("/repos/{}/{}", owner, name),
                message: "Not Found".into(),
            })
    }

    fn list_repository_forks(&self, _ctx: &RunContext, repo: &str) -> Result<Vec<ForkInfo>> {
        Ok(self.fork_of(repo).into_iter().collect())
    }

    fn get_user_repository_fork(&self, ctx: &RunContext, repo: &str) -> Result<ForkInfo> {
        ctx.check()?;
        let mut state = self.0.borrow_mut();
        state.calls.push(HostedCall::LookupFork(repo.into()));
        if state.failing_lookups.contains(repo) {
            return Err(ForkyardError::GithubApi {
                status: 500,
                url: format!("/repos/org/{}/forks", repo),
                message: "Server Error".into(),
            });
        }
        state
            .forks
            .get(repo)
            .cloned()
            .ok_or_else(|| ForkyardError::ForkNotFound(repo.into()))
    }
}
