use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::context::RunContext;
use crate::config::types::GithubConfig;
use crate::error::{ForkyardError, Result};

/// Upper bound for a single API call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PER_PAGE: &str = "100";

/// A fork: its name and owner login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkInfo {
    pub name: String,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
}

/// The subset of GitHub repository metadata forkyard reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub ssh_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub parent: Option<RepositoryRef>,
}

/// Hosted repository service used to fork and rename repositories.
pub trait HostedService {
    /// Fork `organization/repo` into the user account. Fork creation is
    /// asynchronous on the service side.
    fn fork_repository(&self, ctx: &RunContext, repo: &str) -> Result<()>;

    fn rename_repository(
        &self,
        ctx: &RunContext,
        owner: &str,
        name: &str,
        new_name: &str,
    ) -> Result<()>;

    fn get_repository(&self, ctx: &RunContext, owner: &str, name: &str)
    -> Result<RepositoryMetadata>;

    /// Every fork of `organization/repo`, across all pages.
    fn list_repository_forks(&self, ctx: &RunContext, repo: &str) -> Result<Vec<ForkInfo>>;

    /// The authenticated user's fork of `organization/repo`, or
    /// [`ForkyardError::ForkNotFound`].
    fn get_user_repository_fork(&self, ctx: &RunContext, repo: &str) -> Result<ForkInfo>;
}

/// GitHub REST API client.
pub struct GithubClient {
    http: Client,
    api_url: String,
    organization: String,
    username: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        let http = Client::builder()
            .user_agent(concat!("forkyard/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            organization: config.organization.clone(),
            username: config.username.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, ctx: &RunContext, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.api_url, path))
            .timeout(ctx.call_timeout(REQUEST_TIMEOUT));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, ctx: &RunContext, builder: RequestBuilder) -> Result<Response> {
        ctx.check()?;
        let response = builder.send().map_err(|e| {
            if e.is_timeout() && ctx.check().is_err() {
                ForkyardError::DeadlineExceeded
            } else {
                ForkyardError::Http(e)
            }
        })?;
        check_status(response)
    }

    /// GET every page of a list endpoint, starting at page 1.
    fn paginate<T: DeserializeOwned>(&self, ctx: &RunContext, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = Some(1u32);
        while let Some(current) = page {
            let page_param = current.to_string();
            let builder = self
                .request(ctx, Method::GET, path)
                .query(&[("per_page", PER_PAGE), ("page", page_param.as_str())]);
            let response = self.send(ctx, builder)?;
            page = next_page(response.headers()).filter(|next| *next > current);
            let batch: Vec<T> = response.json()?;
            tracing::debug!(path, page = current, count = batch.len(), "fetched page");
            items.extend(batch);
        }
        Ok(items)
    }
}

impl HostedService for GithubClient {
    fn fork_repository(&self, ctx: &RunContext, repo: &str) -> Result<()> {
        tracing::info!("forking {}/{}", self.organization, repo);
        let path = format!("/repos/{}/{}/forks", self.organization, repo);
        let builder = self
            .request(ctx, Method::POST, &path)
            .json(&serde_json::json!({}));
        // 202 Accepted: GitHub scheduled the fork; it is a success status.
        self.send(ctx, builder)?;
        Ok(())
    }

    fn rename_repository(
        &self,
        ctx: &RunContext,
        owner: &str,
        name: &str,
        new_name: &str,
    ) -> Result<()> {
        tracing::info!("renaming {}/{} to {}", owner, name, new_name);
        let path = format!("/repos/{}/{}", owner, name);
        let builder = self
            .request(ctx, Method::PATCH, &path)
            .json(&serde_json::json!({ "name": new_name }));
        self.send(ctx, builder)?;
        Ok(())
    }

    fn get_repository(
        &self,
        ctx: &RunContext,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryMetadata> {
        let path = format!("/repos/{}/{}", owner, name);
        let response = self.send(ctx, self.request(ctx, Method::GET, &path))?;
        Ok(response.json()?)
    }

    fn list_repository_forks(&self, ctx: &RunContext, repo: &str) -> Result<Vec<ForkInfo>> {
        let path = format!("/repos/{}/{}/forks", self.organization, repo);
        let forks: Vec<RepositoryMetadata> = self.paginate(ctx, &path)?;
        Ok(forks
            .into_iter()
            .map(|r| ForkInfo {
                name: r.name,
                owner: r.owner.login,
            })
            .collect())
    }

    fn get_user_repository_fork(&self, ctx: &RunContext, repo: &str) -> Result<ForkInfo> {
        self.list_repository_forks(ctx, repo)?
            .into_iter()
            .find(|fork| fork.owner.eq_ignore_ascii_case(&self.username))
            .ok_or_else(|| ForkyardError::ForkNotFound(repo.to_string()))
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers();
    let remaining = header_str(headers, "x-ratelimit-remaining");
    if (status.as_u16() == 403 || status.as_u16() == 429) && remaining == Some("0") {
        let reset = header_str(headers, "x-ratelimit-reset")
            .and_then(|r| r.parse().ok())
            .unwrap_or_default();
        return Err(ForkyardError::RateLimited { reset });
    }
    let url = response.url().to_string();
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    Err(ForkyardError::GithubApi {
        status: status.as_u16(),
        url,
        message,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Page number of the `rel="next"` entry of a `Link` header.
pub fn next_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == r#"rel="next""#) {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = reqwest::Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    })
}
