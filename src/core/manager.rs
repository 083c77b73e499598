use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::context::RunContext;
use super::filter::{self, Filter};
use super::git_ops::{Git2Vcs, LocalRepo, Vcs};
use super::github::{GithubClient, HostedService};
use super::identity::SshIdentity;
use super::repo::{self, CloneState, RepoType, Repository};
use crate::config::types::ForkyardConfig;
use crate::error::{ForkyardError, Result};

pub const UPSTREAM_REMOTE: &str = "upstream";

/// Desired state and naming conventions the manager reconciles against.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub root_directory: PathBuf,
    pub core: Vec<String>,
    pub tooling: Vec<String>,
    pub services: Vec<String>,
    pub username: String,
    pub organization: String,
    pub fork_prefix: String,
    pub fork_grace_period: Duration,
}

impl ManagerSettings {
    pub fn from_config(cfg: &ForkyardConfig) -> Result<Self> {
        if cfg.github.username.trim().is_empty() {
            return Err(ForkyardError::Config(
                "github.username is not set (or FORKYARD_GITHUB_USERNAME)".into(),
            ));
        }
        if cfg.github.organization.trim().is_empty() {
            return Err(ForkyardError::Config("github.organization is empty".into()));
        }
        Ok(Self {
            root_directory: cfg.root_directory.clone(),
            core: cfg.repositories.core.clone(),
            tooling: cfg.repositories.tooling.clone(),
            services: cfg.repositories.services.clone(),
            username: cfg.github.username.clone(),
            organization: cfg.github.organization.clone(),
            fork_prefix: cfg.github.fork_prefix.clone(),
            fork_grace_period: Duration::from_millis(cfg.git.fork_grace_period_ms),
        })
    }

    fn configured(&self, repo_type: RepoType) -> &[String] {
        match repo_type {
            RepoType::Core => &self.core,
            RepoType::Tooling => &self.tooling,
            RepoType::Controller => &self.services,
            RepoType::Unknown => &[],
        }
    }
}

/// How a multi-repository ensure run reacts to a failing repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnsureMode {
    #[default]
    FailFast,
    /// Reconcile every repository and report all failures at the end.
    KeepGoing,
}

/// Events emitted during an ensure run for progress reporting.
pub enum EnsureEvent<'a> {
    Started(&'a str),
    Finished { name: &'a str, ok: bool },
}

#[derive(Debug)]
pub struct RepoFailure {
    pub name: String,
    pub error: ForkyardError,
}

/// Outcome of an ensure run.
#[derive(Debug, Default)]
pub struct EnsureReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<RepoFailure>,
}

impl EnsureReport {
    /// `Err(EnsureFailed)` when any repository failed.
    pub fn into_result(self) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(ForkyardError::EnsureFailed {
            failed: self.failed.len(),
            total: self.failed.len() + self.succeeded.len(),
        })
    }
}

/// Owns the repository cache and converges forks and local clones toward
/// the configured repositories.
pub struct Manager {
    settings: ManagerSettings,
    vcs: Box<dyn Vcs>,
    hosted: Box<dyn HostedService>,
    repos: Vec<Repository>,
}

impl Manager {
    pub fn new(
        settings: ManagerSettings,
        vcs: Box<dyn Vcs>,
        hosted: Box<dyn HostedService>,
    ) -> Self {
        Self {
            settings,
            vcs,
            hosted,
            repos: Vec::new(),
        }
    }

    /// Manager wired to git2 over SSH and the GitHub API.
    pub fn from_config(cfg: &ForkyardConfig) -> Result<Self> {
        let settings = ManagerSettings::from_config(cfg)?;
        let ssh_dir = SshIdentity::default_ssh_dir();
        let identity = SshIdentity::discover(cfg.git.ssh_key_path.as_deref(), ssh_dir.as_deref())?;
        let hosted = GithubClient::new(&cfg.github)?;
        Ok(Self::new(
            settings,
            Box::new(Git2Vcs::new(identity)),
            Box::new(hosted),
        ))
    }

    /// Cached repositories in load order.
    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    /// Load one configured repository into the cache, probing its local clone.
    /// Loading an already cached repository returns the cached entry.
    pub fn load_repository(&mut self, name: &str, repo_type: RepoType) -> Result<&Repository> {
        let mut repo = Repository::new(name, repo_type);
        if let Ok(idx) = self.position(&repo.name) {
            return Ok(&self.repos[idx]);
        }

        if !self
            .settings
            .configured(repo_type)
            .iter()
            .any(|configured| configured == name)
        {
            return Err(ForkyardError::UnconfiguredRepo(name.to_string()));
        }

        let fork_name = repo::fork_name(&self.settings.fork_prefix, &repo.name);
        repo.full_path = self.settings.root_directory.join(&repo.name);
        repo.fork_url = repo::remote_url(&self.settings.username, &fork_name);
        repo.remote_url = repo.fork_url.clone();
        repo.upstream_url = repo::remote_url(&self.settings.organization, &repo.name);
        repo.fork_name = fork_name;

        if let Some(handle) = self.vcs.open(&repo.full_path)? {
            repo.git_head = handle.head_shorthand()?;
            repo.state = CloneState::Cloned(handle);
        }
        debug!(
            name = %repo.name,
            cloned = repo.is_cloned(),
            head = %repo.git_head,
            "loaded repository"
        );

        self.repos.push(repo);
        Ok(&self.repos[self.repos.len() - 1])
    }

    /// Load core, tooling, then service repositories in configuration order.
    /// Stops at the first error; entries loaded before it stay cached.
    pub fn load_all(&mut self) -> Result<()> {
        let lists = [
            (RepoType::Core, self.settings.core.clone()),
            (RepoType::Tooling, self.settings.tooling.clone()),
            (RepoType::Controller, self.settings.services.clone()),
        ];
        for (repo_type, names) in lists {
            for name in &names {
                self.load_repository(name, repo_type)?;
            }
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.repos
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| ForkyardError::RepoNotFound(name.to_string()))
    }

    /// A cached repository by its exact (suffixed) name.
    pub fn get_repository(&self, name: &str) -> Result<&Repository> {
        self.position(name).map(|idx| &self.repos[idx])
    }

    /// Alias of [`Manager::list_and`].
    pub fn list(&self, filters: &[Filter]) -> Vec<&Repository> {
        self.list_and(filters)
    }

    pub fn list_and(&self, filters: &[Filter]) -> Vec<&Repository> {
        filter::select_all(&self.repos, filters)
    }

    pub fn list_or(&self, filters: &[Filter]) -> Vec<&Repository> {
        filter::select_any(&self.repos, filters)
    }

    /// Clone the user's fork of a cached repository into its expected path
    /// and register the `upstream` remote.
    pub(crate) fn clone_repository(&mut self, ctx: &RunContext, name: &str) -> Result<()> {
        let idx = self
            .position(name)
            .map_err(|e| ForkyardError::CannotClone {
                name: name.to_string(),
                source: Box::new(e),
            })?;

        let repo = &self.repos[idx];
        match repo.state {
            CloneState::Cloned(_) => return Err(ForkyardError::AlreadyCloned(name.to_string())),
            CloneState::Incomplete => {
                warn!("{} is cloned but unregistered, repairing", name);
            }
            CloneState::NotCloned => {
                self.vcs
                    .clone_repo(ctx, &repo.fork_url, &repo.full_path)
                    .map_err(|e| match e {
                        ForkyardError::AuthenticationRequired { .. } => {
                            ForkyardError::MissingGithubCredentials(name.to_string())
                        }
                        ForkyardError::Cancelled | ForkyardError::DeadlineExceeded => e,
                        other => ForkyardError::CannotClone {
                            name: name.to_string(),
                            source: Box::new(other),
                        },
                    })?;
            }
        }

        self.register_clone(idx).map_err(|e| {
            self.repos[idx].state = CloneState::Incomplete;
            ForkyardError::IncompleteClone {
                name: name.to_string(),
                source: Box::new(e),
            }
        })
    }

    /// Open a freshly cloned repository and add its `upstream` remote.
    fn register_clone(&mut self, idx: usize) -> Result<()> {
        let repo = &mut self.repos[idx];
        let handle = self
            .vcs
            .open(&repo.full_path)?
            .ok_or_else(|| ForkyardError::RepoNotFound(repo.full_path.display().to_string()))?;
        ensure_upstream(handle.as_ref(), &repo.upstream_url)?;
        repo.git_head = handle.head_shorthand()?;
        repo.state = CloneState::Cloned(handle);
        info!("cloned {} into {}", repo.name, repo.full_path.display());
        Ok(())
    }

    /// Make sure the user owns a fork of the repository named with the
    /// configured prefix, creating or renaming it as needed.
    fn ensure_fork(&mut self, ctx: &RunContext, idx: usize) -> Result<()> {
        let repo = &mut self.repos[idx];
        let expected = repo::fork_name(&self.settings.fork_prefix, &repo.name);

        match self.hosted.get_user_repository_fork(ctx, &repo.name) {
            Ok(fork) if fork.name == expected => {
                debug!("fork {}/{} is up to date", fork.owner, fork.name);
            }
            Ok(fork) => {
                self.hosted
                    .rename_repository(ctx, &fork.owner, &fork.name, &expected)?;
            }
            Err(ForkyardError::ForkNotFound(_)) => {
                self.hosted.fork_repository(ctx, &repo.name)?;
                // Fork creation completes asynchronously on the service.
                ctx.wait(self.settings.fork_grace_period)?;
                if expected != repo.name {
                    self.hosted.rename_repository(
                        ctx,
                        &self.settings.username,
                        &repo.name,
                        &expected,
                    )?;
                }
            }
            Err(e) => return Err(e),
        }
        repo.fork_name = expected;
        Ok(())
    }

    /// Clone the repository unless it already is; an existing clone only
    /// gets a missing `upstream` remote added.
    fn ensure_clone(&mut self, ctx: &RunContext, idx: usize) -> Result<()> {
        let name = self.repos[idx].name.clone();
        match self.clone_repository(ctx, &name) {
            Err(ForkyardError::AlreadyCloned(_)) => {
                let repo = &self.repos[idx];
                if let Some(handle) = repo.state.handle() {
                    ensure_upstream(handle, &repo.upstream_url)?;
                }
                Ok(())
            }
            other => other,
        }
    }

    fn ensure_at(&mut self, ctx: &RunContext, idx: usize) -> Result<()> {
        self.ensure_fork(ctx, idx)?;
        self.ensure_clone(ctx, idx)
    }

    /// Fork then clone one cached repository.
    pub fn ensure_repository(&mut self, ctx: &RunContext, name: &str) -> Result<()> {
        let idx = self.position(name)?;
        self.ensure_at(ctx, idx)
    }

    /// Fork then clone every cached repository, stopping at the first failure.
    pub fn ensure_all(&mut self, ctx: &RunContext) -> Result<()> {
        self.ensure_all_with(ctx, EnsureMode::FailFast, None)
            .map(|_| ())
    }

    pub fn ensure_all_with(
        &mut self,
        ctx: &RunContext,
        mode: EnsureMode,
        progress: Option<&dyn Fn(EnsureEvent)>,
    ) -> Result<EnsureReport> {
        let indices: Vec<usize> = (0..self.repos.len()).collect();
        self.ensure_indices(ctx, &indices, mode, progress)
    }

    /// Like [`Manager::ensure_all_with`], restricted to the named repositories.
    /// Every name must be cached before any work starts.
    pub fn ensure_named_with(
        &mut self,
        ctx: &RunContext,
        names: &[String],
        mode: EnsureMode,
        progress: Option<&dyn Fn(EnsureEvent)>,
    ) -> Result<EnsureReport> {
        let indices = names
            .iter()
            .map(|name| self.position(name))
            .collect::<Result<Vec<_>>>()?;
        self.ensure_indices(ctx, &indices, mode, progress)
    }

    fn ensure_indices(
        &mut self,
        ctx: &RunContext,
        indices: &[usize],
        mode: EnsureMode,
        progress: Option<&dyn Fn(EnsureEvent)>,
    ) -> Result<EnsureReport> {
        let mut report = EnsureReport::default();
        for &idx in indices {
            ctx.check()?;
            let name = self.repos[idx].name.clone();
            if let Some(cb) = progress {
                cb(EnsureEvent::Started(&name));
            }

            let result = self.ensure_at(ctx, idx);
            if let Some(cb) = progress {
                cb(EnsureEvent::Finished {
                    name: &name,
                    ok: result.is_ok(),
                });
            }

            match result {
                Ok(()) => report.succeeded.push(name),
                Err(e @ (ForkyardError::Cancelled | ForkyardError::DeadlineExceeded)) => {
                    return Err(e);
                }
                Err(e) if mode == EnsureMode::FailFast => return Err(e),
                Err(e) => {
                    warn!("cannot reconcile {}: {}", name, e);
                    report.failed.push(RepoFailure { name, error: e });
                }
            }
        }
        Ok(report)
    }
}

fn ensure_upstream(handle: &dyn LocalRepo, upstream_url: &str) -> Result<()> {
    if handle.remote_url(UPSTREAM_REMOTE)?.is_none() {
        debug!("adding {} remote {}", UPSTREAM_REMOTE, upstream_url);
        handle.create_remote(UPSTREAM_REMOTE, upstream_url)?;
    }
    Ok(())
}
