use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{
    DependencyUpdateRow, OnboardingStatusRow, PullRequestRow, Snapshot, SnapshotSummary,
};

#[async_trait]
pub trait PullRequestRepository: Send + Sync {
    async fn list_by_repo(&self, repo: &str) -> Result<Vec<PullRequestRow>>;
    async fn list_updates(&self, pr_id: i64) -> Result<Vec<DependencyUpdateRow>>;
    async fn count(&self) -> Result<i64>;
}

#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    async fn list_by_repo(&self, repo: &str) -> Result<Vec<OnboardingStatusRow>>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Atomically swaps the stored snapshot for `snapshot`.
    async fn replace(&self, snapshot: Snapshot) -> Result<SnapshotSummary>;
}

pub trait Repositories: Send + Sync {
    fn pull_requests(&self) -> &dyn PullRequestRepository;
    fn onboarding(&self) -> &dyn OnboardingRepository;
    fn snapshots(&self) -> &dyn SnapshotRepository;
}
