//! The collaborator boundary between the analysis core and an SCM host.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use normalizer::{Commit, PullRequest, RepositoryRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The host has no commit history for the repository (empty, or the
    /// default branch was renamed away).
    #[error("repository {0} has no commits")]
    EmptyRepository(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Server-side narrowing of the pull requests a source returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestFilter {
    pub author: Option<String>,
    pub label: Option<String>,
}

#[async_trait]
pub trait ScmSource: Send + Sync {
    async fn fetch_pull_requests(
        &self,
        repo: &RepositoryRef,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, SourceError>;

    /// Commits on the default branch since `since`, oldest first.
    async fn fetch_commits(
        &self,
        repo: &RepositoryRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<Commit>, SourceError>;

    /// Path names of the entries at the root of the commit's tree.
    async fn fetch_root_tree(
        &self,
        repo: &RepositoryRef,
        sha: &str,
    ) -> Result<Vec<String>, SourceError>;
}

pub type SharedSource = Arc<dyn ScmSource>;
