#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use analysis::{PullRequestFilter, ScmSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use normalizer::{Commit, PullRequest, RepositoryRef};

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn pull_request(number: i64, title: &str, body: &str) -> PullRequest {
    PullRequest {
        repo: RepositoryRef::new("acme", "web"),
        number,
        url: format!("https://github.com/acme/web/pull/{number}"),
        title: title.into(),
        body: body.into(),
        labels: Vec::new(),
        author: Some("renovate[bot]".into()),
        created_at: utc(2024, 1, 1, 0),
        closed_at: None,
        merged_at: None,
    }
}

/// In-memory repository history: commits plus the root tree of each sha.
#[derive(Default)]
pub struct FakeSource {
    pub commits: Vec<Commit>,
    pub trees: HashMap<String, Vec<String>>,
    pub tree_requests: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_commit(mut self, sha: &str, date: DateTime<Utc>, files: &[&str]) -> Self {
        self.commits.push(Commit {
            sha: sha.into(),
            effective_date: date,
        });
        self.trees
            .insert(sha.into(), files.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn tree_requests(&self) -> Vec<String> {
        self.tree_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScmSource for FakeSource {
    async fn fetch_pull_requests(
        &self,
        _repo: &RepositoryRef,
        _filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, SourceError> {
        Ok(Vec::new())
    }

    async fn fetch_commits(
        &self,
        repo: &RepositoryRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<Commit>, SourceError> {
        if self.commits.is_empty() {
            return Err(SourceError::EmptyRepository(repo.full_name()));
        }
        Ok(self
            .commits
            .iter()
            .filter(|c| c.effective_date >= since)
            .cloned()
            .collect())
    }

    async fn fetch_root_tree(
        &self,
        _repo: &RepositoryRef,
        sha: &str,
    ) -> Result<Vec<String>, SourceError> {
        self.tree_requests.lock().unwrap().push(sha.to_string());
        self.trees
            .get(sha)
            .cloned()
            .ok_or_else(|| SourceError::Other(anyhow::anyhow!("unknown sha {sha}")))
    }
}
