mod support;

use std::sync::Arc;

use analysis::{CommitTimeline, OnboardingReconstructor, OnboardingStatus, SamplingSchedule};
use normalizer::RepositoryRef;
use support::{pull_request, utc, FakeSource};

fn repo() -> RepositoryRef {
    RepositoryRef::new("acme", "web")
}

async fn reconstruct_statuses(
    source: FakeSource,
    prs: &[normalizer::PullRequest],
    samples: &[chrono::DateTime<chrono::Utc>],
) -> (Vec<OnboardingStatus>, Arc<FakeSource>) {
    let source = Arc::new(source);
    let schedule = SamplingSchedule::new(52, 1).unwrap();
    let cutoff = SamplingSchedule::commit_cutoff(samples).unwrap();
    let mut timeline = CommitTimeline::load(source.clone(), repo(), cutoff)
        .await
        .unwrap();
    let result = OnboardingReconstructor::new(&schedule)
        .reconstruct(&mut timeline, prs, samples)
        .await
        .unwrap();
    assert_eq!(result.len(), samples.len());
    assert!(result.iter().all(|s| s.repo == "acme/web"));
    (result.into_iter().map(|s| s.status).collect(), source)
}

#[tokio::test]
async fn long_open_onboarding_pr_is_in_progress_until_config_lands() {
    let source = FakeSource::default()
        .with_commit("c1", utc(2024, 1, 2, 9), &["README.md", "package.json"])
        .with_commit("c2", utc(2024, 2, 14, 9), &["README.md", "package.json", "renovate.json"]);
    let mut onboarding = pull_request(1, "Configure Renovate", "");
    onboarding.created_at = utc(2024, 1, 10, 0);
    // still open: created before every sample below, never closed

    let samples = [
        utc(2024, 1, 8, 8),
        utc(2024, 1, 15, 8),
        utc(2024, 1, 22, 8),
        utc(2024, 2, 19, 8),
    ];
    let (statuses, _) = reconstruct_statuses(source, &[onboarding], &samples).await;
    assert_eq!(
        statuses,
        vec![
            OnboardingStatus::Disabled,
            OnboardingStatus::InProgress,
            OnboardingStatus::InProgress,
            OnboardingStatus::Onboarded,
        ]
    );
}

#[tokio::test]
async fn quickly_closed_onboarding_pr_does_not_count() {
    let source = FakeSource::default().with_commit("c1", utc(2024, 1, 2, 9), &["README.md"]);
    let mut onboarding = pull_request(1, "Configure Renovate", "");
    onboarding.created_at = utc(2024, 1, 14, 0);
    onboarding.closed_at = Some(utc(2024, 1, 20, 0));

    let samples = [utc(2024, 1, 15, 8)];
    let (statuses, _) = reconstruct_statuses(source, &[onboarding.clone()], &samples).await;
    assert_eq!(statuses, vec![OnboardingStatus::Disabled]);

    // merged more than one interval after the sample: counts
    let source = FakeSource::default().with_commit("c1", utc(2024, 1, 2, 9), &["README.md"]);
    onboarding.closed_at = None;
    onboarding.merged_at = Some(utc(2024, 1, 30, 0));
    let (statuses, _) = reconstruct_statuses(source, &[onboarding], &samples).await;
    assert_eq!(statuses, vec![OnboardingStatus::InProgress]);
}

#[tokio::test]
async fn empty_repository_is_disabled_everywhere() {
    let samples = [utc(2024, 1, 8, 8), utc(2024, 1, 15, 8)];
    let (statuses, source) = reconstruct_statuses(FakeSource::default(), &[], &samples).await;
    assert_eq!(statuses, vec![OnboardingStatus::Disabled; 2]);
    assert!(source.tree_requests().is_empty());
}

#[tokio::test]
async fn samples_sharing_a_commit_fetch_its_tree_once() {
    let source = FakeSource::default().with_commit("c1", utc(2023, 12, 28, 9), &["renovate.json5", "src"]);
    let samples = [utc(2024, 1, 1, 8), utc(2024, 1, 8, 8), utc(2024, 1, 15, 8)];
    let (statuses, source) = reconstruct_statuses(source, &[], &samples).await;
    assert_eq!(statuses, vec![OnboardingStatus::Onboarded; 3]);
    assert_eq!(source.tree_requests(), vec!["c1".to_string()]);
}
