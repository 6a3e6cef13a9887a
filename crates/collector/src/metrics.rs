use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};

pub static FETCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_requests_total",
        "GitHub API calls grouped by operation and outcome",
        &["op", "outcome"]
    )
    .expect("collector fetch requests total")
});

pub static FETCH_RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_retries_total",
        "GitHub API calls retried after a transient failure, grouped by operation",
        &["op"]
    )
    .expect("collector fetch retries total")
});

pub static FETCH_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collector_fetch_latency_seconds",
        "Latency of GitHub API calls grouped by operation",
        &["op"],
        vec![0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .expect("collector fetch latency seconds")
});

pub static PULL_REQUESTS_CLASSIFIED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_pull_requests_classified_total",
        "Pull requests seen by the collector grouped by classification",
        &["kind"]
    )
    .expect("collector pull requests classified")
});

pub static PULL_REQUESTS_SKIPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_pull_requests_skipped_total",
        "Dependency update PRs dropped because their update table could not be extracted",
        &["reason"]
    )
    .expect("collector pull requests skipped")
});

pub static DEPENDENCY_UPDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_dependency_updates_total",
        "Dependency updates extracted grouped by update type",
        &["update_type"]
    )
    .expect("collector dependency updates")
});

pub static ONBOARDING_SAMPLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_onboarding_samples_total",
        "Onboarding status samples grouped by status",
        &["status"]
    )
    .expect("collector onboarding samples")
});

pub static REPOS_PROCESSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_repositories_processed_total",
        "Repositories processed by the collector grouped by outcome",
        &["outcome"]
    )
    .expect("collector repositories processed")
});

pub static REPO_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collector_repository_duration_seconds",
        "Duration spent processing a repository grouped by outcome",
        &["outcome"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("collector repository duration histogram")
});

pub static RUN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "collector_run_duration_seconds",
        "Duration of a full collector run in seconds",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0, 3600.0]
    )
    .expect("collector run duration histogram")
});

/// Prometheus text exposition of everything registered in the default registry.
pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
