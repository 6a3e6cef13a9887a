use std::time::Instant;

use analysis::{
    CommitTimeline, ExtractError, OnboardingReconstructor, PrClassifier, PrKind,
    PullRequestFilter, PullRequestRecord, RecordExtractor, RepositoryOnboardingStatus,
    SamplingSchedule, SharedSource, SourceError,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use common::config::AppConfig;
use db::{NewDependencyUpdate, NewOnboardingStatus, NewPullRequest, Snapshot};
use futures::stream::{self, StreamExt};
use normalizer::{PullRequest, RepositoryRef};
use tracing::{debug, info, instrument, warn};

use crate::metrics;

/// Everything one run produced, in resolved repository order.
#[derive(Debug, Clone, Default)]
pub struct CollectionOutput {
    pub pull_requests: Vec<PullRequestRecord>,
    pub onboarding_statuses: Vec<RepositoryOnboardingStatus>,
    /// Repositories skipped because the source failed for them.
    pub failed_repos: Vec<String>,
}

impl CollectionOutput {
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            pull_requests: self.pull_requests.iter().map(to_pull_request_row).collect(),
            onboarding_statuses: self
                .onboarding_statuses
                .iter()
                .map(to_onboarding_row)
                .collect(),
        }
    }
}

struct RepoOutput {
    pull_requests: Vec<PullRequestRecord>,
    onboarding_statuses: Vec<RepositoryOnboardingStatus>,
}

pub struct Collector {
    source: SharedSource,
    classifier: PrClassifier,
    extractor: RecordExtractor,
    schedule: SamplingSchedule,
    filter: PullRequestFilter,
    max_concurrent_repos: usize,
}

impl Collector {
    pub fn new(
        source: SharedSource,
        classifier: PrClassifier,
        extractor: RecordExtractor,
        schedule: SamplingSchedule,
        filter: PullRequestFilter,
    ) -> Self {
        Self {
            source,
            classifier,
            extractor,
            schedule,
            filter,
            max_concurrent_repos: 1,
        }
    }

    pub fn from_config(source: SharedSource, config: &AppConfig) -> Result<Self> {
        let renovate = &config.renovate;
        let classifier = PrClassifier::from_config(renovate)
            .context("compiling renovate.onboarding_title_regex")?;
        let schedule = SamplingSchedule::from_config(&config.onboarding)
            .ok_or_else(|| anyhow!("onboarding.interval_weeks must be positive"))?;
        let filter = PullRequestFilter {
            author: renovate.bot_user().map(str::to_string),
            label: renovate.pr_label().map(str::to_string),
        };
        Ok(Self::new(
            source,
            classifier,
            RecordExtractor::from_config(renovate),
            schedule,
            filter,
        )
        .with_max_concurrent_repos(config.collector.max_concurrent_repos))
    }

    pub fn with_max_concurrent_repos(mut self, limit: usize) -> Self {
        self.max_concurrent_repos = limit.max(1);
        self
    }

    /// Processes every repository. A failing repository is logged and skipped.
    #[instrument(skip_all, fields(repos = repos.len()))]
    pub async fn run(&self, repos: &[RepositoryRef], now: DateTime<Utc>) -> CollectionOutput {
        let _timer = metrics::RUN_DURATION.start_timer();
        let samples = self.schedule.sample_dates(now);
        let cutoff =
            SamplingSchedule::commit_cutoff(&samples).unwrap_or_else(|| now - Duration::weeks(1));
        info!(
            samples = samples.len(),
            cutoff = %cutoff,
            concurrency = self.max_concurrent_repos,
            "collecting renovate data"
        );

        let samples = samples.as_slice();
        let results: Vec<(RepositoryRef, Option<RepoOutput>)> = stream::iter(repos)
            .map(|repo| async move {
                let output = self.process_repo(repo, samples, cutoff).await;
                (repo.clone(), output)
            })
            .buffered(self.max_concurrent_repos)
            .collect()
            .await;

        let mut output = CollectionOutput::default();
        for (repo, result) in results {
            match result {
                Some(repo_output) => {
                    output.pull_requests.extend(repo_output.pull_requests);
                    output
                        .onboarding_statuses
                        .extend(repo_output.onboarding_statuses);
                }
                None => output.failed_repos.push(repo.full_name()),
            }
        }
        info!(
            pull_requests = output.pull_requests.len(),
            onboarding_statuses = output.onboarding_statuses.len(),
            failed_repos = output.failed_repos.len(),
            "collection finished"
        );
        output
    }

    async fn process_repo(
        &self,
        repo: &RepositoryRef,
        samples: &[DateTime<Utc>],
        cutoff: DateTime<Utc>,
    ) -> Option<RepoOutput> {
        let started = Instant::now();
        let result = self.collect_repo(repo, samples, cutoff).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::REPOS_PROCESSED_TOTAL
            .with_label_values(&[outcome])
            .inc();
        metrics::REPO_DURATION
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());
        match result {
            Ok(output) => Some(output),
            Err(err) => {
                warn!(repo = %repo, error = %err, "failed to process repository, skipping");
                None
            }
        }
    }

    #[instrument(skip_all, fields(repo = %repo))]
    async fn collect_repo(
        &self,
        repo: &RepositoryRef,
        samples: &[DateTime<Utc>],
        cutoff: DateTime<Utc>,
    ) -> Result<RepoOutput, SourceError> {
        let prs = self.source.fetch_pull_requests(repo, &self.filter).await?;
        let (onboarding_prs, pull_requests) = self.classify_and_extract(prs);

        let mut timeline = CommitTimeline::load(self.source.clone(), repo.clone(), cutoff).await?;
        let onboarding_statuses = OnboardingReconstructor::new(&self.schedule)
            .reconstruct(&mut timeline, &onboarding_prs, samples)
            .await?;
        for status in &onboarding_statuses {
            metrics::ONBOARDING_SAMPLES_TOTAL
                .with_label_values(&[status.status.as_str()])
                .inc();
        }
        debug!(
            pull_requests = pull_requests.len(),
            onboarding_prs = onboarding_prs.len(),
            commits = timeline.len(),
            "repository processed"
        );
        Ok(RepoOutput {
            pull_requests,
            onboarding_statuses,
        })
    }

    /// Splits into onboarding PRs and extracted dependency update records.
    fn classify_and_extract(
        &self,
        prs: Vec<PullRequest>,
    ) -> (Vec<PullRequest>, Vec<PullRequestRecord>) {
        let mut onboarding = Vec::new();
        let mut records = Vec::new();
        for pr in prs {
            let kind = self.classifier.classify(&pr);
            metrics::PULL_REQUESTS_CLASSIFIED_TOTAL
                .with_label_values(&[kind_label(kind)])
                .inc();
            match kind {
                PrKind::Onboarding => onboarding.push(pr),
                PrKind::DependencyUpdate => match self.extractor.extract(&pr) {
                    Ok(record) => {
                        for update in &record.dependency_updates {
                            metrics::DEPENDENCY_UPDATES_TOTAL
                                .with_label_values(&[update.update_type.as_str()])
                                .inc();
                        }
                        records.push(record);
                    }
                    Err(err) => {
                        metrics::PULL_REQUESTS_SKIPPED_TOTAL
                            .with_label_values(&[skip_reason(&err)])
                            .inc();
                        warn!(
                            repo = %pr.repo,
                            number = pr.number,
                            url = %pr.url,
                            error = %err,
                            "skipping pull request"
                        );
                    }
                },
                PrKind::Irrelevant => {}
            }
        }
        (onboarding, records)
    }
}

fn kind_label(kind: PrKind) -> &'static str {
    match kind {
        PrKind::Onboarding => "onboarding",
        PrKind::DependencyUpdate => "dependency_update",
        PrKind::Irrelevant => "irrelevant",
    }
}

fn skip_reason(err: &ExtractError) -> &'static str {
    match err {
        ExtractError::MalformedUpdateTable(_) => "malformed_table",
        ExtractError::UnparseableVersion { .. } => "unparseable_version",
    }
}

pub fn to_pull_request_row(record: &PullRequestRecord) -> NewPullRequest {
    NewPullRequest {
        repo: record.repo.clone(),
        created_date: record.created_at,
        closed_date: record.closed_at,
        close_type: record.close_type.map(|close| close.as_str().to_string()),
        number: record.number,
        url: record.url.clone(),
        dependency_updates: record
            .dependency_updates
            .iter()
            .map(|update| NewDependencyUpdate {
                dependency_name: update.dependency_name.clone(),
                old_version: update.old_version.clone(),
                new_version: update.new_version.clone(),
                update_type: update.update_type.as_str().to_string(),
            })
            .collect(),
    }
}

pub fn to_onboarding_row(status: &RepositoryOnboardingStatus) -> NewOnboardingStatus {
    NewOnboardingStatus {
        repo: status.repo.clone(),
        sample_date: status.sample_date,
        status: status.status.as_str().to_string(),
    }
}
