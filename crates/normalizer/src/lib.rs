pub mod models;
pub mod payloads;
pub mod transform;

pub use models::{Commit, PullRequest, RepositoryRef};
pub use payloads::{CommitPayload, PullRequestPayload, RepoPayload, SearchPayload, TreePayload};
pub use transform::{normalize_commit, normalize_pull_request, normalize_repo, normalize_tree};
