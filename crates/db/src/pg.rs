use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Transaction};
use tokio::time::{sleep, Duration};
use tracing::{info, instrument, warn};

use crate::errors::{DbError, Result};
use crate::models::{
    DependencyUpdateRow, NewDependencyUpdate, NewOnboardingStatus, OnboardingStatusRow,
    PullRequestRow, Snapshot, SnapshotSummary,
};
use crate::repositories::{
    OnboardingRepository, PullRequestRepository, Repositories, SnapshotRepository,
};

/// Rows per multi-row INSERT, well below Postgres' bind parameter limit.
const INSERT_CHUNK: usize = 1000;

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(DbError::Migration)
}

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
    pull_request_repo: Arc<PgPullRequestRepository>,
    onboarding_repo: Arc<PgOnboardingRepository>,
    snapshot_repo: Arc<PgSnapshotRepository>,
}

impl PgDatabase {
    pub async fn connect(database_url: &str) -> Result<Self> {
        const MAX_ATTEMPTS: u32 = 5;
        const BASE_DELAY_MS: u64 = 500;

        let mut attempts = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    run_migrations(&pool).await?;
                    return Ok(Self::from_pool(pool));
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Err(DbError::Query(err));
                    }

                    let exp = (attempts - 1).min(5);
                    let backoff = Duration::from_millis(BASE_DELAY_MS * (1u64 << exp));
                    warn!(
                        attempts,
                        error = %err,
                        wait_ms = backoff.as_millis(),
                        "database connection failed; retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let pull_request_repo = Arc::new(PgPullRequestRepository { pool: pool.clone() });
        let onboarding_repo = Arc::new(PgOnboardingRepository { pool: pool.clone() });
        let snapshot_repo = Arc::new(PgSnapshotRepository { pool: pool.clone() });

        Self {
            pool,
            pull_request_repo,
            onboarding_repo,
            snapshot_repo,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Repositories for PgDatabase {
    fn pull_requests(&self) -> &dyn PullRequestRepository {
        &*self.pull_request_repo
    }

    fn onboarding(&self) -> &dyn OnboardingRepository {
        &*self.onboarding_repo
    }

    fn snapshots(&self) -> &dyn SnapshotRepository {
        &*self.snapshot_repo
    }
}

#[derive(Clone)]
struct PgPullRequestRepository {
    pool: PgPool,
}

#[async_trait]
impl PullRequestRepository for PgPullRequestRepository {
    async fn list_by_repo(&self, repo: &str) -> Result<Vec<PullRequestRow>> {
        sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT id, repo, created_date, closed_date, close_type, number, url
            FROM pull_requests
            WHERE repo = $1
            ORDER BY number
            "#,
        )
        .bind(repo)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn list_updates(&self, pr_id: i64) -> Result<Vec<DependencyUpdateRow>> {
        sqlx::query_as::<_, DependencyUpdateRow>(
            r#"
            SELECT id, pr_id, dependency_name, old_version, new_version, update_type
            FROM dependency_updates
            WHERE pr_id = $1
            ORDER BY id
            "#,
        )
        .bind(pr_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pull_requests")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)
    }
}

#[derive(Clone)]
struct PgOnboardingRepository {
    pool: PgPool,
}

#[async_trait]
impl OnboardingRepository for PgOnboardingRepository {
    async fn list_by_repo(&self, repo: &str) -> Result<Vec<OnboardingStatusRow>> {
        sqlx::query_as::<_, OnboardingStatusRow>(
            r#"
            SELECT id, repo, sample_date, status
            FROM repository_onboarding_statuses
            WHERE repo = $1
            ORDER BY sample_date
            "#,
        )
        .bind(repo)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}

#[derive(Clone)]
struct PgSnapshotRepository {
    pool: PgPool,
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    #[instrument(skip(self, snapshot), fields(
        pull_requests = snapshot.pull_requests.len(),
        onboarding_statuses = snapshot.onboarding_statuses.len()
    ))]
    async fn replace(&self, snapshot: Snapshot) -> Result<SnapshotSummary> {
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        // dependency_updates go with their pull requests (ON DELETE CASCADE)
        sqlx::query("DELETE FROM pull_requests")
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;
        sqlx::query("DELETE FROM repository_onboarding_statuses")
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;

        let mut summary = SnapshotSummary::default();
        for pr in snapshot.pull_requests {
            let pr_id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO pull_requests (repo, created_date, closed_date, close_type, number, url)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(&pr.repo)
            .bind(pr.created_date)
            .bind(pr.closed_date)
            .bind(&pr.close_type)
            .bind(pr.number)
            .bind(&pr.url)
            .fetch_one(&mut *tx)
            .await
            .map_err(DbError::Query)?;

            summary.pull_requests += 1;
            summary.dependency_updates +=
                insert_dependency_updates(&mut tx, pr_id, &pr.dependency_updates).await?;
        }

        summary.onboarding_statuses =
            insert_onboarding_statuses(&mut tx, &snapshot.onboarding_statuses).await?;

        tx.commit().await.map_err(DbError::Query)?;
        info!(
            pull_requests = summary.pull_requests,
            dependency_updates = summary.dependency_updates,
            onboarding_statuses = summary.onboarding_statuses,
            "snapshot replaced"
        );
        Ok(summary)
    }
}

async fn insert_dependency_updates(
    tx: &mut Transaction<'_, Postgres>,
    pr_id: i64,
    updates: &[NewDependencyUpdate],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in updates.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO dependency_updates (pr_id, dependency_name, old_version, new_version, update_type) ",
        );
        builder.push_values(chunk, |mut row, update| {
            row.push_bind(pr_id)
                .push_bind(&update.dependency_name)
                .push_bind(&update.old_version)
                .push_bind(&update.new_version)
                .push_bind(&update.update_type);
        });
        inserted += builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(DbError::Query)?
            .rows_affected();
    }
    Ok(inserted)
}

async fn insert_onboarding_statuses(
    tx: &mut Transaction<'_, Postgres>,
    statuses: &[NewOnboardingStatus],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in statuses.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO repository_onboarding_statuses (repo, sample_date, status) ",
        );
        builder.push_values(chunk, |mut row, status| {
            row.push_bind(&status.repo)
                .push_bind(status.sample_date)
                .push_bind(&status.status);
        });
        inserted += builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(DbError::Query)?
            .rows_affected();
    }
    Ok(inserted)
}
