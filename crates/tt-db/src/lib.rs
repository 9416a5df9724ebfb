use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod import_tx;

pub use import_tx::{begin_import, PgImportTx};

pub const ENV_DB_URL: &str = "TT_DATABASE_URL";

/// Connect to Postgres using the URL held in env var `url_env`.
pub async fn connect_from_env(url_env: &str, max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(url_env).with_context(|| format!("missing env var {url_env}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_postgis: bool,
    pub has_routes_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (has_postgis,): (bool,) = sqlx::query_as::<_, (bool,)>(
        "select exists (select 1 from pg_extension where extname = 'postgis')",
    )
    .fetch_one(pool)
    .await
    .context("status extension query failed")?;

    let (has_routes_table,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'routes'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_postgis,
        has_routes_table,
    })
}
