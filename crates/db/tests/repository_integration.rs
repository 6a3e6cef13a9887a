use chrono::{TimeZone, Utc};
use db::{
    pg::PgDatabase, NewDependencyUpdate, NewOnboardingStatus, NewPullRequest, Repositories,
    Snapshot,
};
use db_test_fixture::DbFixture;

fn snapshot(repo: &str, updates: &[(&str, &str)]) -> Snapshot {
    Snapshot {
        pull_requests: vec![NewPullRequest {
            repo: repo.into(),
            created_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            closed_date: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            close_type: Some("merge".into()),
            number: 3,
            url: format!("https://github.com/{repo}/pull/3"),
            dependency_updates: updates
                .iter()
                .map(|(name, update_type)| NewDependencyUpdate {
                    dependency_name: name.to_string(),
                    old_version: "1.0.0".into(),
                    new_version: "1.0.1".into(),
                    update_type: update_type.to_string(),
                })
                .collect(),
        }],
        onboarding_statuses: vec![NewOnboardingStatus {
            repo: repo.into(),
            sample_date: Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap(),
            status: "onboarded".into(),
        }],
    }
}

#[tokio::test]
async fn replace_swaps_the_whole_snapshot() -> anyhow::Result<()> {
    let fixture = match DbFixture::from_env() {
        Ok(fixture) => fixture,
        Err(err) => {
            eprintln!("skipping replace_swaps_the_whole_snapshot: {err}");
            return Ok(());
        }
    };
    let handle = fixture.create_unmigrated("snapshot_replace").await?;

    let database = PgDatabase::connect(handle.database_url()).await?;

    let first = database
        .snapshots()
        .replace(snapshot("acme/web", &[("lodash", "patch"), ("react", "major")]))
        .await?;
    assert_eq!(first.pull_requests, 1);
    assert_eq!(first.dependency_updates, 2);
    assert_eq!(first.onboarding_statuses, 1);

    let second = database
        .snapshots()
        .replace(snapshot("acme/api", &[("express", "digest")]))
        .await?;
    assert_eq!(second.dependency_updates, 1);

    assert!(database.pull_requests().list_by_repo("acme/web").await?.is_empty());
    assert!(database.onboarding().list_by_repo("acme/web").await?.is_empty());
    assert_eq!(database.pull_requests().count().await?, 1);

    let prs = database.pull_requests().list_by_repo("acme/api").await?;
    let updates = database.pull_requests().list_updates(prs[0].id).await?;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].update_type, "digest");
    assert_eq!(prs[0].close_type.as_deref(), Some("merge"));

    let statuses = database.onboarding().list_by_repo("acme/api").await?;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, "onboarded");

    drop(database);
    handle.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_update_type_rolls_back() -> anyhow::Result<()> {
    let fixture = match DbFixture::from_env() {
        Ok(fixture) => fixture,
        Err(err) => {
            eprintln!("skipping unknown_update_type_rolls_back: {err}");
            return Ok(());
        }
    };
    let handle = fixture.create("snapshot_rollback").await?;
    let database = PgDatabase::from_pool(handle.pool().clone());

    database
        .snapshots()
        .replace(snapshot("acme/web", &[("lodash", "patch")]))
        .await?;
    let result = database
        .snapshots()
        .replace(snapshot("acme/api", &[("express", "sideways")]))
        .await;
    assert!(result.is_err());
    assert_eq!(database.pull_requests().list_by_repo("acme/web").await?.len(), 1);

    drop(database);
    handle.cleanup().await?;
    Ok(())
}
