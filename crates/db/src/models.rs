use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PullRequestRow {
    pub id: i64,
    pub repo: String,
    pub created_date: DateTime<Utc>,
    pub closed_date: Option<DateTime<Utc>>,
    pub close_type: Option<String>,
    pub number: i64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DependencyUpdateRow {
    pub id: i64,
    pub pr_id: i64,
    pub dependency_name: String,
    pub old_version: String,
    pub new_version: String,
    pub update_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OnboardingStatusRow {
    pub id: i64,
    pub repo: String,
    pub sample_date: DateTime<Utc>,
    pub status: String,
}

/// A pull request to insert together with its dependency updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub repo: String,
    pub created_date: DateTime<Utc>,
    pub closed_date: Option<DateTime<Utc>>,
    pub close_type: Option<String>,
    pub number: i64,
    pub url: String,
    pub dependency_updates: Vec<NewDependencyUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDependencyUpdate {
    pub dependency_name: String,
    pub old_version: String,
    pub new_version: String,
    pub update_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOnboardingStatus {
    pub repo: String,
    pub sample_date: DateTime<Utc>,
    pub status: String,
}

/// The complete output of one collector run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub pull_requests: Vec<NewPullRequest>,
    pub onboarding_statuses: Vec<NewOnboardingStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub pull_requests: u64,
    pub dependency_updates: u64,
    pub onboarding_statuses: u64,
}
