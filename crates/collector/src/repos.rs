//! Expansion of the configured `github.repos` entries into concrete repositories.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use normalizer::{normalize_repo, RepoPayload, RepositoryRef};
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{GithubClient, RepoOwner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSpec {
    /// `owner/name`
    Repository(RepositoryRef),
    /// `owner`: every repository of an organization
    Organization(String),
    /// `user:<login>`: every repository owned by a user
    User(String),
}

impl RepoSpec {
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        if let Some(login) = entry.strip_prefix("user:") {
            let login = login.trim();
            if login.is_empty() || login.contains('/') {
                bail!("invalid repository entry {entry:?}: expected 'user:<login>'");
            }
            return Ok(RepoSpec::User(login.to_string()));
        }
        if entry.contains('/') {
            return Ok(RepoSpec::Repository(
                entry
                    .parse::<RepositoryRef>()
                    .context("invalid repository entry")?,
            ));
        }
        if entry.is_empty() {
            bail!("empty repository entry");
        }
        Ok(RepoSpec::Organization(entry.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
}

/// Login of the token's owner. Fails on an invalid or expired token.
pub async fn authenticated_login<C: GithubClient + ?Sized>(client: &C) -> Result<String> {
    let value = client
        .get_authenticated_user()
        .await
        .context("verifying github.token")?;
    let user: AuthenticatedUser = serde_json::from_value(value)?;
    Ok(user.login)
}

/// Resolves every entry, in order. Duplicates (case-insensitive) are an error.
pub async fn resolve_repositories<C: GithubClient + ?Sized>(
    client: &C,
    entries: &[String],
    authenticated_login: &str,
    page_size: u32,
) -> Result<Vec<RepositoryRef>> {
    let mut resolved = Vec::new();
    for entry in entries.iter().filter(|e| !e.trim().is_empty()) {
        match RepoSpec::parse(entry)? {
            RepoSpec::Repository(repo) => {
                let value = client
                    .get_repo(&repo.owner, &repo.name)
                    .await
                    .with_context(|| format!("unable to find repository {repo}"))?;
                let payload: RepoPayload = serde_json::from_value(value)?;
                resolved.push(normalize_repo(&payload)?);
            }
            RepoSpec::Organization(org) => {
                let repos = list_all(client, &RepoOwner::Organization(org.clone()), page_size)
                    .await
                    .with_context(|| format!("listing repositories of organization {org}"))?;
                debug!(owner = %org, count = repos.len(), "expanded organization");
                resolved.extend(repos);
            }
            RepoSpec::User(login) => {
                let owner = if login.eq_ignore_ascii_case(authenticated_login) {
                    RepoOwner::AuthenticatedUser
                } else {
                    RepoOwner::User(login.clone())
                };
                let repos = list_all(client, &owner, page_size)
                    .await
                    .with_context(|| format!("listing repositories of user {login}"))?;
                debug!(owner = %login, count = repos.len(), "expanded user");
                resolved.extend(repos);
            }
        }
    }

    let duplicates = find_duplicates(&resolved);
    if !duplicates.is_empty() {
        bail!(
            "duplicate repositories in github.repos: {}",
            duplicates.join(", ")
        );
    }
    info!(count = resolved.len(), "resolved repositories");
    Ok(resolved)
}

async fn list_all<C: GithubClient + ?Sized>(
    client: &C,
    owner: &RepoOwner,
    page_size: u32,
) -> Result<Vec<RepositoryRef>> {
    let per_page = page_size.clamp(1, 100);
    let mut repos = Vec::new();
    let mut page = 1u32;
    loop {
        let values = client.list_owner_repos(owner, page, per_page).await?;
        let received = values.len() as u32;
        for value in values {
            let payload: RepoPayload = serde_json::from_value(value)?;
            repos.push(normalize_repo(&payload)?);
        }
        if received < per_page {
            break;
        }
        page += 1;
    }
    Ok(repos)
}

fn find_duplicates(repos: &[RepositoryRef]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for repo in repos {
        let key = repo.full_name().to_lowercase();
        if !seen.insert(key) && !duplicates.contains(&repo.full_name()) {
            duplicates.push(repo.full_name());
        }
    }
    duplicates
}
