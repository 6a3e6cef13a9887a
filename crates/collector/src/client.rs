use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::GithubConfig;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::backoff::exponential_jitter_backoff;
use crate::metrics;

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest wait honoured for an exhausted rate limit before giving up on the call.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("github api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
}

impl GithubApiError {
    pub fn status(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match *self {
            GithubApiError::Http { status, .. } => status,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            GithubApiError::Http { endpoint, .. } => endpoint.as_str(),
        }
    }
}

/// HTTP status of a failed GitHub call, if the error carries one.
pub fn api_status(err: &anyhow::Error) -> Option<StatusCode> {
    err.downcast_ref::<GithubApiError>()
        .map(GithubApiError::status_code)
}

/// Whose repositories to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOwner {
    Organization(String),
    User(String),
    /// Repositories owned by the token's account, private ones included.
    AuthenticatedUser,
}

#[async_trait]
pub trait GithubClient: Send + Sync {
    async fn get_authenticated_user(&self) -> Result<Value>;
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Value>;
    async fn list_owner_repos(&self, owner: &RepoOwner, page: u32, per_page: u32)
        -> Result<Vec<Value>>;
    async fn search_issues(&self, query: &str, page: u32, per_page: u32) -> Result<Value>;
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>>;
    async fn get_tree(&self, owner: &str, repo: &str, sha: &str) -> Result<Value>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
    pub jitter_frac: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            jitter_frac: 0.2,
        }
    }
}

pub struct RestGithubClient {
    http: reqwest::Client,
    base: Url,
    retry: RetryPolicy,
}

impl RestGithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
            .context("github token contains invalid header characters")?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;

        let mut base = config.api_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .with_context(|| format!("invalid github.api_base_url {base:?}"))?;

        Ok(Self {
            http,
            base,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[instrument(skip(self, url), fields(url = %url))]
    async fn get_json(&self, op: &'static str, url: Url) -> Result<Value> {
        let endpoint = url.path().trim_start_matches('/').to_string();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(endpoint = %endpoint, attempt, "dispatching GitHub request");
            let timer = metrics::FETCH_LATENCY_SECONDS
                .with_label_values(&[op])
                .start_timer();
            let result = self.http.get(url.clone()).send().await;
            timer.observe_duration();

            let server_wait = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        metrics::FETCH_REQUESTS_TOTAL
                            .with_label_values(&[op, "ok"])
                            .inc();
                        return response
                            .json::<Value>()
                            .await
                            .with_context(|| format!("decoding response of {endpoint}"));
                    }
                    let headers = response.headers();
                    if !is_transient(status, headers) || attempt >= self.retry.max_attempts {
                        metrics::FETCH_REQUESTS_TOTAL
                            .with_label_values(&[op, status_outcome(status)])
                            .inc();
                        return Err(GithubApiError::status(status, endpoint).into());
                    }
                    let wait = advised_wait(headers);
                    if wait.is_some_and(|wait| wait > MAX_RATE_LIMIT_WAIT) {
                        metrics::FETCH_REQUESTS_TOTAL
                            .with_label_values(&[op, "rate_limited"])
                            .inc();
                        return Err(GithubApiError::status(status, endpoint).into());
                    }
                    warn!(endpoint = %endpoint, status = %status, attempt, "transient GitHub error");
                    wait
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect();
                    if !transient || attempt >= self.retry.max_attempts {
                        metrics::FETCH_REQUESTS_TOTAL
                            .with_label_values(&[op, "transport"])
                            .inc();
                        return Err(anyhow!(err).context(format!("requesting {endpoint}")));
                    }
                    warn!(endpoint = %endpoint, error = %err, attempt, "GitHub request failed");
                    None
                }
            };

            metrics::FETCH_RETRIES_TOTAL.with_label_values(&[op]).inc();
            let wait = server_wait.unwrap_or_else(|| {
                exponential_jitter_backoff(
                    self.retry.base,
                    attempt - 1,
                    self.retry.max,
                    self.retry.jitter_frac,
                )
            });
            sleep(wait).await;
        }
    }

    async fn get_json_array(&self, op: &'static str, url: Url) -> Result<Vec<Value>> {
        match self.get_json(op, url).await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            _ => Err(anyhow!("expected array response")),
        }
    }

    fn join(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn with_query(url: &mut Url, params: &[(&str, String)]) {
        let mut query_pairs = url.query_pairs_mut();
        for (key, val) in params {
            query_pairs.append_pair(key, val);
        }
    }
}

#[async_trait]
impl GithubClient for RestGithubClient {
    async fn get_authenticated_user(&self) -> Result<Value> {
        let url = self.join("user")?;
        self.get_json("get_authenticated_user", url).await
    }

    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Value> {
        let url = self.join(&format!("repos/{owner}/{repo}"))?;
        self.get_json("get_repo", url).await
    }

    async fn list_owner_repos(
        &self,
        owner: &RepoOwner,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut params = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let path = match owner {
            RepoOwner::Organization(org) => format!("orgs/{org}/repos"),
            RepoOwner::User(login) => format!("users/{login}/repos"),
            RepoOwner::AuthenticatedUser => {
                params.push(("type", "owner".to_string()));
                "user/repos".to_string()
            }
        };
        let mut url = self.join(&path)?;
        Self::with_query(&mut url, &params);
        self.get_json_array("list_owner_repos", url).await
    }

    async fn search_issues(&self, query: &str, page: u32, per_page: u32) -> Result<Value> {
        let mut url = self.join("search/issues")?;
        let params = [
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        Self::with_query(&mut url, &params);
        self.get_json("search_issues", url).await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("repos/{owner}/{repo}/commits"))?;
        let params = [
            ("since", since.to_rfc3339()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        Self::with_query(&mut url, &params);
        self.get_json_array("list_commits", url).await
    }

    async fn get_tree(&self, owner: &str, repo: &str, sha: &str) -> Result<Value> {
        let url = self.join(&format!("repos/{owner}/{repo}/git/trees/{sha}"))?;
        self.get_json("get_tree", url).await
    }
}

/// 429, 5xx, and 403 caused by an exhausted rate limit are worth retrying.
fn is_transient(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
        || (status == StatusCode::FORBIDDEN
            && (headers.contains_key(header::RETRY_AFTER) || rate_limit_remaining(headers) == Some(0)))
}

fn rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, "x-ratelimit-remaining")
}

/// Wait requested by the server through `Retry-After` or the rate limit reset time.
fn advised_wait(headers: &HeaderMap) -> Option<Duration> {
    if let Some(seconds) = header_u64(headers, header::RETRY_AFTER.as_str()) {
        return Some(Duration::from_secs(seconds));
    }
    if rate_limit_remaining(headers) == Some(0) {
        let reset = header_u64(headers, "x-ratelimit-reset")?;
        let now = Utc::now().timestamp().max(0) as u64;
        return Some(Duration::from_secs(reset.saturating_sub(now) + 1));
    }
    None
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn status_outcome(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "denied",
        status if status.is_server_error() => "server_error",
        _ => "error",
    }
}
