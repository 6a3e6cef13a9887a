use std::sync::Arc;

use analysis::{PullRequestFilter, ScmSource, SourceError};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use normalizer::{
    normalize_commit, normalize_pull_request, normalize_tree, Commit, CommitPayload, PullRequest,
    RepositoryRef, SearchPayload, TreePayload,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::client::{api_status, GithubClient};

/// The search API never returns results past this offset.
const SEARCH_RESULT_WINDOW: u32 = 1000;
const MAX_PAGE_SIZE: u32 = 100;

/// [`ScmSource`] over the GitHub REST API.
pub struct GithubSource<C: GithubClient + 'static> {
    client: Arc<C>,
    page_size: u32,
}

impl<C: GithubClient + 'static> GithubSource<C> {
    pub fn new(client: Arc<C>, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

pub fn search_query(repo: &RepositoryRef, filter: &PullRequestFilter) -> String {
    let mut query = format!("repo:{} is:pr", repo.full_name());
    if let Some(label) = &filter.label {
        query.push_str(&format!(" label:\"{label}\""));
    }
    if let Some(author) = &filter.author {
        query.push_str(&format!(" author:{author}"));
    }
    query
}

#[async_trait]
impl<C: GithubClient + 'static> ScmSource for GithubSource<C> {
    async fn fetch_pull_requests(
        &self,
        repo: &RepositoryRef,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, SourceError> {
        let query = search_query(repo, filter);
        let mut pull_requests = Vec::new();
        let mut page = 1u32;
        loop {
            let value = self
                .client
                .search_issues(&query, page, self.page_size)
                .await
                .with_context(|| format!("searching pull requests of {repo}"))?;
            let payload: SearchPayload =
                serde_json::from_value(value).context("decoding search results")?;
            if payload.incomplete_results {
                warn!(repo = %repo, page, "search results reported as incomplete");
            }
            let received = payload.items.len() as u32;
            pull_requests.extend(
                payload
                    .items
                    .iter()
                    .filter(|item| item.pull_request.is_some())
                    .map(|item| normalize_pull_request(item, repo)),
            );

            let seen = page * self.page_size;
            if received < self.page_size
                || u64::from(seen) >= payload.total_count
                || seen >= SEARCH_RESULT_WINDOW
            {
                if payload.total_count > u64::from(SEARCH_RESULT_WINDOW) {
                    warn!(
                        repo = %repo,
                        total = payload.total_count,
                        "more pull requests than the search API returns; older ones are missing"
                    );
                }
                break;
            }
            page += 1;
        }
        debug!(repo = %repo, count = pull_requests.len(), "fetched pull requests");
        Ok(pull_requests)
    }

    async fn fetch_commits(
        &self,
        repo: &RepositoryRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<Commit>, SourceError> {
        let mut payloads = Vec::new();
        let mut page = 1u32;
        loop {
            let values = match self
                .client
                .list_commits(&repo.owner, &repo.name, since, page, self.page_size)
                .await
            {
                Ok(values) => values,
                Err(err) => {
                    return Err(match api_status(&err) {
                        // 409: empty repository, 404: default branch missing
                        Some(StatusCode::CONFLICT | StatusCode::NOT_FOUND) => {
                            SourceError::EmptyRepository(repo.full_name())
                        }
                        _ => SourceError::Other(
                            err.context(format!("listing commits of {repo}")),
                        ),
                    })
                }
            };
            let received = values.len() as u32;
            for value in values {
                let payload: CommitPayload =
                    serde_json::from_value(value).context("decoding commit")?;
                payloads.push(payload);
            }
            if received < self.page_size {
                break;
            }
            page += 1;
        }

        // newest first on the wire
        payloads.reverse();
        let commits = payloads
            .iter()
            .filter_map(|payload| {
                let commit = normalize_commit(payload);
                if commit.is_none() {
                    warn!(repo = %repo, sha = %payload.sha, "commit without author or committer date, skipping");
                }
                commit
            })
            .collect();
        Ok(commits)
    }

    async fn fetch_root_tree(
        &self,
        repo: &RepositoryRef,
        sha: &str,
    ) -> Result<Vec<String>, SourceError> {
        let value = self
            .client
            .get_tree(&repo.owner, &repo.name, sha)
            .await
            .with_context(|| format!("fetching tree {sha} of {repo}"))?;
        let payload: TreePayload = serde_json::from_value(value).context("decoding tree")?;
        Ok(normalize_tree(&payload))
    }
}
