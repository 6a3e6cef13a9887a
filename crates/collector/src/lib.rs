pub mod backoff;
pub mod client;
pub mod metrics;
pub mod repos;
pub mod service;
pub mod source;

pub use client::{GithubApiError, GithubClient, RepoOwner, RestGithubClient, RetryPolicy};
pub use repos::{authenticated_login, resolve_repositories, RepoSpec};
pub use service::{CollectionOutput, Collector};
pub use source::GithubSource;
