// Acme fixture imported into real Postgres/PostGIS through PgImportTx.

use tt_reconcile::{
    run_import, FeedTarget, ImportOptions, NoopProgress, RegionTarget, TxOutcome,
};
use tt_testkit::fixtures::{self, acme_feed};
use uuid::Uuid;

/// DB-backed test. Skips if TT_DATABASE_URL is not set.
async fn pool_or_skip() -> anyhow::Result<Option<sqlx::PgPool>> {
    let url = match std::env::var(tt_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: TT_DATABASE_URL not set");
            return Ok(None);
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;

    tt_db::migrate(&pool).await?;
    Ok(Some(pool))
}

// Unique region per test run so leftover rows in a developer DB never collide.
fn unique_options() -> ImportOptions {
    ImportOptions::new(
        RegionTarget::Named {
            name: format!("Testland_{}", Uuid::new_v4().simple()),
            country_code: fixtures::COUNTRY_CODE.to_string(),
        },
        FeedTarget::Named {
            name: fixtures::FEED_NAME.to_string(),
            source_url: None,
        },
    )
}

async fn route_count(pool: &sqlx::PgPool, feed_id: i32) -> anyhow::Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as("select count(*) from routes where feed_id = $1 and is_active")
            .bind(feed_id)
            .fetch_one(pool)
            .await?;
    Ok(n)
}

#[tokio::test]
async fn acme_import_commits_and_dry_run_discards() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let options = unique_options();

    let tx = tt_db::begin_import(&pool, 120).await?;
    let s = run_import(tx, &mut acme_feed(), &options, TxOutcome::Commit, &NoopProgress).await?;

    assert!(s.regions_created == 1);
    assert!(s.feeds_created == 1);
    assert_eq!(s.routes_inserted, 2);
    let feed_id = s.feed_id.expect("feed id");
    assert_eq!(route_count(&pool, feed_id).await?, 2);

    let (stop_count,): (Option<i32>,) = sqlx::query_as(
        "select stop_count from routes where feed_id = $1 and gtfs_route_id = 'R1'",
    )
    .bind(feed_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(stop_count, Some(2));

    let (assoc,): (i64,) = sqlx::query_as(
        r#"
        select count(*) from route_shapes rs
        join routes r on r.id = rs.route_id
        where r.feed_id = $1
        "#,
    )
    .bind(feed_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(assoc, 2);

    let (version, length): (Option<String>, Option<f64>) = sqlx::query_as(
        r#"
        select f.version, r.longest_trip_length_m
        from feeds f join routes r on r.feed_id = f.id
        where f.id = $1 and r.gtfs_route_id = 'R1'
        "#,
    )
    .bind(feed_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(version.as_deref(), Some("2026.10"));
    // one degree of longitude at the equator
    let length = length.expect("longest trip length");
    assert!((length - 111_319.0).abs() < 500.0, "length={length}");

    // Second run in routes mode against the same feed finds nothing new.
    let mut again = options.clone();
    again.feed = FeedTarget::Id(feed_id);
    again.update_mode = tt_reconcile::UpdateMode::Routes;
    let tx = tt_db::begin_import(&pool, 120).await?;
    let s2 = run_import(tx, &mut acme_feed(), &again, TxOutcome::Commit, &NoopProgress).await?;
    assert_eq!(s2.routes_inserted, 0);
    assert_eq!(route_count(&pool, feed_id).await?, 2);

    // Dry run of a fresh region leaves nothing behind. Runs in the same test
    // because shape ids are shared across feeds.
    let options = unique_options();
    let tx = tt_db::begin_import(&pool, 120).await?;
    let s = run_import(tx, &mut acme_feed(), &options, TxOutcome::Discard, &NoopProgress).await?;
    assert!(s.dry_run);
    assert_eq!(s.routes_inserted, 2);

    let (exists,): (bool,) =
        sqlx::query_as("select exists (select 1 from feeds where id = $1)")
            .bind(s.feed_id.expect("feed id"))
            .fetch_one(&pool)
            .await?;
    assert!(!exists);

    Ok(())
}

#[tokio::test]
async fn migrate_twice_and_status_reports_schema() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };

    tt_db::migrate(&pool).await?;
    let st = tt_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_postgis);
    assert!(st.has_routes_table);

    Ok(())
}
