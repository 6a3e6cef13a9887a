use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use collector::{
    authenticated_login, metrics, resolve_repositories, Collector, GithubSource, RestGithubClient,
};
use common::{config::AppConfig, logging};
use db::pg::PgDatabase;
use db::Repositories;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    logging::init_logging(&config.observability.log_level);
    config.validate()?;

    let client = Arc::new(RestGithubClient::new(&config.github)?);
    let login = authenticated_login(client.as_ref()).await?;
    info!(login = %login, "authenticated against GitHub");

    let repos = resolve_repositories(
        client.as_ref(),
        &config.github.repos,
        &login,
        config.collector.page_size,
    )
    .await?;

    let source = Arc::new(GithubSource::new(client, config.collector.page_size));
    let collector = Collector::from_config(source, &config)?;
    let output = collector.run(&repos, Utc::now()).await;
    if !output.failed_repos.is_empty() {
        warn!(repos = ?output.failed_repos, "some repositories produced no data");
    }

    let database = PgDatabase::connect(&config.database.url)
        .await
        .context("connecting to database")?;
    let summary = database
        .snapshots()
        .replace(output.into_snapshot())
        .await
        .context("storing snapshot")?;
    info!(
        pull_requests = summary.pull_requests,
        dependency_updates = summary.dependency_updates,
        onboarding_statuses = summary.onboarding_statuses,
        "run complete"
    );

    if let Some(path) = &config.observability.metrics_file {
        tokio::fs::write(path, metrics::render()?)
            .await
            .with_context(|| format!("writing metrics to {path}"))?;
    }
    Ok(())
}
