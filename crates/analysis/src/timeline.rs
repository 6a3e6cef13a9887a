use std::collections::HashMap;

use chrono::{DateTime, Utc};
use normalizer::{Commit, RepositoryRef};
use tracing::{debug, warn};

use crate::source::{SharedSource, SourceError};

const CONFIG_FILE_NAMES: [&str; 2] = ["renovate.json", "renovate.json5"];

/// Commit history of one repository with a per-sha cache of root trees.
///
/// A timeline belongs to exactly one repository; the cache is never shared.
pub struct CommitTimeline {
    source: SharedSource,
    repo: RepositoryRef,
    commits: Vec<Commit>,
    trees: HashMap<String, Vec<String>>,
}

impl CommitTimeline {
    /// Fetches the commits since `cutoff`. A repository without history yields
    /// an empty timeline instead of an error.
    pub async fn load(
        source: SharedSource,
        repo: RepositoryRef,
        cutoff: DateTime<Utc>,
    ) -> Result<Self, SourceError> {
        let commits = match source.fetch_commits(&repo, cutoff).await {
            Ok(commits) => commits,
            Err(SourceError::EmptyRepository(_)) => {
                warn!(repo = %repo, "no commits found, treating history as empty");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        debug!(repo = %repo, commits = commits.len(), "loaded commit timeline");
        Ok(Self::from_commits(source, repo, commits))
    }

    pub fn from_commits(source: SharedSource, repo: RepositoryRef, mut commits: Vec<Commit>) -> Self {
        commits.sort_by_key(|commit| commit.effective_date);
        Self {
            source,
            repo,
            commits,
            trees: HashMap::new(),
        }
    }

    pub fn repo(&self) -> &RepositoryRef {
        &self.repo
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// The last commit whose effective date is at or before `date`.
    pub fn closest_commit_at_or_before(&self, date: DateTime<Utc>) -> Option<&Commit> {
        let end = self
            .commits
            .partition_point(|commit| commit.effective_date <= date);
        end.checked_sub(1).map(|index| &self.commits[index])
    }

    pub async fn root_tree(&mut self, sha: &str) -> Result<&[String], SourceError> {
        if !self.trees.contains_key(sha) {
            let entries = self.source.fetch_root_tree(&self.repo, sha).await?;
            self.trees.insert(sha.to_string(), entries);
        }
        Ok(self.trees.get(sha).map(Vec::as_slice).unwrap_or_default())
    }

    /// Whether the repository's root held a Renovate config file at `date`.
    pub async fn has_config_file(&mut self, date: DateTime<Utc>) -> Result<bool, SourceError> {
        let Some(sha) = self
            .closest_commit_at_or_before(date)
            .map(|commit| commit.sha.clone())
        else {
            return Ok(false);
        };
        let tree = self.root_tree(&sha).await?;
        Ok(tree
            .iter()
            .any(|entry| CONFIG_FILE_NAMES.contains(&entry.as_str())))
    }
}
