use std::fmt;

use chrono::{DateTime, Utc};
use normalizer::PullRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Major,
    MultipleMajor,
    Minor,
    Patch,
    Security,
    Digest,
}

impl UpdateType {
    pub const ALL: [UpdateType; 6] = [
        UpdateType::Major,
        UpdateType::MultipleMajor,
        UpdateType::Minor,
        UpdateType::Patch,
        UpdateType::Security,
        UpdateType::Digest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Major => "major",
            UpdateType::MultipleMajor => "multiple_major",
            UpdateType::Minor => "minor",
            UpdateType::Patch => "patch",
            UpdateType::Security => "security",
            UpdateType::Digest => "digest",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyUpdate {
    pub dependency_name: String,
    pub old_version: String,
    pub new_version: String,
    pub update_type: UpdateType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseType {
    Merge,
    Close,
}

impl CloseType {
    /// Merge wins when the host reports both dates.
    pub fn from_dates(
        merged_at: Option<DateTime<Utc>>,
        closed_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        if merged_at.is_some() {
            Some(CloseType::Merge)
        } else if closed_at.is_some() {
            Some(CloseType::Close)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CloseType::Merge => "merge",
            CloseType::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub repo: String,
    pub number: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// `None` while the pull request is still open.
    pub close_type: Option<CloseType>,
    pub dependency_updates: Vec<DependencyUpdate>,
}

impl PullRequestRecord {
    pub fn new(pr: &PullRequest, dependency_updates: Vec<DependencyUpdate>) -> Self {
        Self {
            repo: pr.repo.full_name(),
            number: pr.number,
            url: pr.url.clone(),
            created_at: pr.created_at,
            closed_at: pr.closed_or_merged_at(),
            close_type: CloseType::from_dates(pr.merged_at, pr.closed_at),
            dependency_updates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Onboarded,
    InProgress,
    Disabled,
}

impl OnboardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStatus::Onboarded => "onboarded",
            OnboardingStatus::InProgress => "in_progress",
            OnboardingStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOnboardingStatus {
    pub repo: String,
    pub sample_date: DateTime<Utc>,
    pub status: OnboardingStatus,
}
