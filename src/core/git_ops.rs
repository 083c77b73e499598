use std::cell::Cell;
use std::path::{Path, PathBuf};

use git2::{
    CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository,
    build::RepoBuilder,
};

use super::context::RunContext;
use super::identity::{SshIdentity, auth_error};
use crate::error::{ForkyardError, Result};

/// An opened local repository.
pub trait LocalRepo {
    /// Current branch name, or the short commit id when HEAD is detached.
    fn head_shorthand(&self) -> Result<String>;

    /// URL of the named remote, `None` when the remote does not exist.
    fn remote_url(&self, name: &str) -> Result<Option<String>>;

    fn create_remote(&self, name: &str, url: &str) -> Result<()>;
}

/// Version-control capability used by the manager.
pub trait Vcs {
    /// Open the repository at `path`. `Ok(None)` means there is no repository there.
    fn open(&self, path: &Path) -> Result<Option<Box<dyn LocalRepo>>>;

    /// Clone `url` into `dest`. Authentication failures surface as
    /// [`ForkyardError::AuthenticationRequired`].
    fn clone_repo(&self, ctx: &RunContext, url: &str, dest: &Path) -> Result<()>;
}

/// libgit2 backed [`Vcs`] authenticating over SSH.
pub struct Git2Vcs {
    identity: SshIdentity,
}

impl Git2Vcs {
    pub fn new(identity: SshIdentity) -> Self {
        Self { identity }
    }
}

struct Git2Repo {
    path: PathBuf,
    repo: Repository,
}

impl Git2Repo {
    fn git_err(&self, source: git2::Error) -> ForkyardError {
        ForkyardError::Git {
            path: self.path.clone(),
            source,
        }
    }
}

impl LocalRepo for Git2Repo {
    fn head_shorthand(&self) -> Result<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().unwrap_or_default().to_string()),
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(|e| self.git_err(e))?;
                let short = commit.as_object().short_id().map_err(|e| self.git_err(e))?;
                Ok(short.as_str().unwrap_or_default().to_string())
            }
            // Fresh repository with no commits: report the branch HEAD points at.
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self
                    .repo
                    .find_reference("HEAD")
                    .map_err(|e| self.git_err(e))?;
                Ok(head
                    .symbolic_target()
                    .map(|t| t.strip_prefix("refs/heads/").unwrap_or(t).to_string())
                    .unwrap_or_default())
            }
            Err(e) => Err(self.git_err(e)),
        }
    }

    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(self.git_err(e)),
        }
    }

    fn create_remote(&self, name: &str, url: &str) -> Result<()> {
        self.repo
            .remote(name, url)
            .map(|_| ())
            .map_err(|e| self.git_err(e))
    }
}

impl Vcs for Git2Vcs {
    fn open(&self, path: &Path) -> Result<Option<Box<dyn LocalRepo>>> {
        match Repository::open(path) {
            Ok(repo) => Ok(Some(Box::new(Git2Repo {
                path: path.to_path_buf(),
                repo,
            }))),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(ForkyardError::Git {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn clone_repo(&self, ctx: &RunContext, url: &str, dest: &Path) -> Result<()> {
        ctx.check()?;
        tracing::info!("cloning {} into {}", url, dest.display());

        let existed = dest.exists();
        let key_attempts = Cell::new(0usize);

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, username, allowed| {
            let username = username.unwrap_or("git");
            if allowed.contains(CredentialType::USERNAME) {
                return git2::Cred::username(username);
            }
            if !allowed.contains(CredentialType::SSH_KEY) {
                return Err(auth_error("remote does not accept ssh keys"));
            }
            // libgit2 asks again after each rejected key.
            let attempt = key_attempts.get();
            key_attempts.set(attempt + 1);
            self.identity.credentials(username, attempt)
        });
        callbacks.transfer_progress(|_| ctx.check().is_ok());

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);

        let result = RepoBuilder::new().fetch_options(fetch).clone(url, dest);
        let Err(e) = result else {
            return Ok(());
        };

        if !existed && dest.exists() {
            if let Err(rm) = std::fs::remove_dir_all(dest) {
                tracing::warn!("cannot remove partial clone {}: {}", dest.display(), rm);
            }
        }
        ctx.check()?;
        if is_auth_failure(&e) {
            return Err(ForkyardError::AuthenticationRequired {
                url: url.to_string(),
            });
        }
        Err(ForkyardError::Git {
            path: dest.to_path_buf(),
            source: e,
        })
    }
}

fn is_auth_failure(e: &git2::Error) -> bool {
    e.code() == ErrorCode::Auth
        || (e.class() == ErrorClass::Ssh && e.message().to_lowercase().contains("auth"))
}
