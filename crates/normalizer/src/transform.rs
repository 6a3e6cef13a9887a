use crate::models::{Commit, InvalidRepositoryRef, PullRequest, RepositoryRef};
use crate::payloads::{CommitPayload, PullRequestPayload, RepoPayload, TreePayload};

pub fn normalize_repo(payload: &RepoPayload) -> Result<RepositoryRef, InvalidRepositoryRef> {
    payload.full_name.parse()
}

pub fn normalize_pull_request(payload: &PullRequestPayload, repo: &RepositoryRef) -> PullRequest {
    PullRequest {
        repo: repo.clone(),
        number: payload.number,
        url: payload.html_url.clone(),
        title: payload.title.clone(),
        body: payload.body.clone().unwrap_or_default(),
        labels: payload.labels.iter().map(|l| l.name.clone()).collect(),
        author: payload.user.as_ref().map(|u| u.login.clone()),
        created_at: payload.created_at,
        closed_at: payload.closed_at,
        merged_at: payload.pull_request.as_ref().and_then(|pr| pr.merged_at),
    }
}

/// Uses the committer date, falling back to the author date. Returns `None`
/// when neither is present.
pub fn normalize_commit(payload: &CommitPayload) -> Option<Commit> {
    let author = payload.commit.author.as_ref().and_then(|s| s.date);
    let committer = payload.commit.committer.as_ref().and_then(|s| s.date);
    let effective_date = committer.or(author)?;
    Some(Commit {
        sha: payload.sha.clone(),
        effective_date,
    })
}

pub fn normalize_tree(payload: &TreePayload) -> Vec<String> {
    payload.tree.iter().map(|entry| entry.path.clone()).collect()
}
