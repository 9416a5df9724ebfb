//! PostgreSQL/PostGIS implementation of the import persistence boundary.
//!
//! All statements of one import run on a single `sqlx::Transaction`. Set-based
//! writes bind Rust slices as Postgres arrays and `unnest` them server-side.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use tt_reconcile::{
    Bounds, FeedRow, FeedStore, NewAgency, NewFeed, NewRegion, RegionRow, RouteUpsert, ShapePoint,
    StoreTransaction, Upserted,
};

/// One open import transaction.
pub struct PgImportTx {
    tx: Transaction<'static, Postgres>,
}

/// Begin an import transaction with `statement_timeout` bounding every
/// statement in it. A timeout surfaces as a store error and aborts the run.
pub async fn begin_import(pool: &PgPool, statement_timeout_secs: u64) -> Result<PgImportTx> {
    let mut tx = pool
        .begin()
        .await
        .context("begin import transaction failed")?;

    let ms = statement_timeout_secs.saturating_mul(1000);
    // SET does not take bind parameters.
    let sql = format!("set local statement_timeout = {ms}");
    sqlx::query(&sql)
        .execute(&mut *tx)
        .await
        .context("set statement_timeout failed")?;
    debug!(statement_timeout_ms = ms, "import transaction started");

    Ok(PgImportTx { tx })
}

fn upserted((id, inserted): (i32, bool)) -> Upserted {
    Upserted { id, inserted }
}

#[async_trait]
impl FeedStore for PgImportTx {
    async fn find_region(&mut self, region_id: i32) -> Result<Option<RegionRow>> {
        let row: Option<(i32, String, String)> =
            sqlx::query_as("select id, name, country_code from regions where id = $1")
                .bind(region_id)
                .fetch_optional(&mut *self.tx)
                .await
                .context("find_region failed")?;

        Ok(row.map(|(id, name, country_code)| RegionRow {
            id,
            name,
            country_code,
        }))
    }

    async fn ensure_region(&mut self, region: &NewRegion) -> Result<Upserted> {
        // inserted = (xmax = 0): true on insert, false when the conflict arm ran.
        let row: (i32, bool) = sqlx::query_as(
            r#"
            insert into regions (name, country_code, scope)
            values ($1, $2, $3)
            on conflict (country_code, name) do update set
              name = excluded.name
            returning id, (xmax = 0)
            "#,
        )
        .bind(&region.name)
        .bind(&region.country_code)
        .bind(region.scope.code())
        .fetch_one(&mut *self.tx)
        .await
        .context("ensure_region failed")?;

        Ok(upserted(row))
    }

    async fn widen_region_bounds(&mut self, region_id: i32, bounds: &Bounds) -> Result<()> {
        // least/greatest skip nulls, so an unset extent takes the new one.
        sqlx::query(
            r#"
            update regions set
              min_lat = least(min_lat, $2),
              min_lon = least(min_lon, $3),
              max_lat = greatest(max_lat, $4),
              max_lon = greatest(max_lon, $5)
            where id = $1
            "#,
        )
        .bind(region_id)
        .bind(bounds.min_lat)
        .bind(bounds.min_lon)
        .bind(bounds.max_lat)
        .bind(bounds.max_lon)
        .execute(&mut *self.tx)
        .await
        .context("widen_region_bounds failed")?;
        Ok(())
    }

    async fn find_feed(&mut self, feed_id: i32) -> Result<Option<FeedRow>> {
        let row: Option<(i32, i32, String)> =
            sqlx::query_as("select id, region_id, name from feeds where id = $1")
                .bind(feed_id)
                .fetch_optional(&mut *self.tx)
                .await
                .context("find_feed failed")?;

        Ok(row.map(|(id, region_id, name)| FeedRow {
            id,
            region_id,
            name,
        }))
    }

    async fn ensure_feed(&mut self, feed: &NewFeed) -> Result<Upserted> {
        let row: (i32, bool) = sqlx::query_as(
            r#"
            insert into feeds (region_id, name, source_url, scope, is_active)
            values ($1, $2, $3, $4, true)
            on conflict (region_id, name) do update set
              source_url = coalesce(excluded.source_url, feeds.source_url)
            returning id, (xmax = 0)
            "#,
        )
        .bind(feed.region_id)
        .bind(&feed.name)
        .bind(&feed.source_url)
        .bind(feed.scope.code())
        .fetch_one(&mut *self.tx)
        .await
        .context("ensure_feed failed")?;

        Ok(upserted(row))
    }

    async fn mark_feed_imported(
        &mut self,
        feed_id: i32,
        version: Option<&str>,
        imported_at: DateTime<Utc>,
    ) -> Result<()> {
        let res = sqlx::query(
            r#"
            update feeds set
              version = coalesce($2, version),
              imported_at = $3,
              is_active = true
            where id = $1
            "#,
        )
        .bind(feed_id)
        .bind(version)
        .bind(imported_at)
        .execute(&mut *self.tx)
        .await
        .context("mark_feed_imported failed")?;

        if res.rows_affected() != 1 {
            bail!("mark_feed_imported failed: feed {feed_id} missing");
        }
        Ok(())
    }

    async fn ensure_agency(&mut self, agency: &NewAgency) -> Result<Upserted> {
        let row: (i32, bool) = sqlx::query_as(
            r#"
            insert into agencies (name, country_code, agency_url, timezone)
            values ($1, $2, $3, $4)
            on conflict (name, country_code) do update set
              name = excluded.name
            returning id, (xmax = 0)
            "#,
        )
        .bind(&agency.name)
        .bind(&agency.country_code)
        .bind(&agency.url)
        .bind(&agency.timezone)
        .fetch_one(&mut *self.tx)
        .await
        .context("ensure_agency failed")?;

        Ok(upserted(row))
    }

    async fn upsert_route(&mut self, route: &RouteUpsert) -> Result<Upserted> {
        // $7 null keeps the stored route_type (unparseable value in the feed).
        let row: (i32, bool) = sqlx::query_as(
            r#"
            insert into routes (
              feed_id, gtfs_route_id, agency_id, short_name, long_name,
              route_type, color, text_color, is_active
            ) values ($1, $2, $3, $4, $5, $6, $8, $9, true)
            on conflict (feed_id, gtfs_route_id) do update set
              agency_id = excluded.agency_id,
              short_name = excluded.short_name,
              long_name = excluded.long_name,
              route_type = coalesce($7, routes.route_type),
              color = excluded.color,
              text_color = excluded.text_color,
              is_active = true
            returning id, (xmax = 0)
            "#,
        )
        .bind(route.feed_id)
        .bind(&route.gtfs_route_id)
        .bind(route.agency_id)
        .bind(&route.short_name)
        .bind(&route.long_name)
        .bind(route.route_type.for_insert())
        .bind(route.route_type.for_update())
        .bind(&route.color)
        .bind(&route.text_color)
        .fetch_one(&mut *self.tx)
        .await
        .with_context(|| format!("upsert_route failed: {}", route.gtfs_route_id))?;

        Ok(upserted(row))
    }

    async fn existing_shape_ids(&mut self, ids: &[String]) -> Result<HashSet<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "select distinct gtfs_shape_id from shapes where gtfs_shape_id = any($1)",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .context("existing_shape_ids failed")?;

        Ok(rows.into_iter().collect())
    }

    async fn delete_shapes(&mut self, ids: &[String]) -> Result<u64> {
        sqlx::query("delete from shape_lines where gtfs_shape_id = any($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .context("delete shape_lines failed")?;

        let res = sqlx::query("delete from shapes where gtfs_shape_id = any($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .context("delete shapes failed")?;

        Ok(res.rows_affected())
    }

    async fn insert_shape_points(&mut self, points: &[ShapePoint]) -> Result<u64> {
        let ids: Vec<&str> = points.iter().map(|p| p.gtfs_shape_id.as_str()).collect();
        let seqs: Vec<i32> = points.iter().map(|p| p.sequence).collect();
        let lats: Vec<f64> = points.iter().map(|p| p.lat).collect();
        let lons: Vec<f64> = points.iter().map(|p| p.lon).collect();

        let res = sqlx::query(
            r#"
            insert into shapes (gtfs_shape_id, sequence, lat, lon, geom)
            select t.shape_id, t.seq, t.lat, t.lon,
                   ST_SetSRID(ST_MakePoint(t.lon, t.lat), 4326)
            from unnest($1::text[], $2::int4[], $3::float8[], $4::float8[])
              with ordinality as t(shape_id, seq, lat, lon, ord)
            order by t.ord
            "#,
        )
        .bind(&ids)
        .bind(&seqs)
        .bind(&lats)
        .bind(&lons)
        .execute(&mut *self.tx)
        .await
        .context("insert_shape_points failed")?;

        Ok(res.rows_affected())
    }

    async fn insert_shape_lines(&mut self, ids: &[String]) -> Result<u64> {
        let res = sqlx::query(
            r#"
            insert into shape_lines (gtfs_shape_id, geom)
            select gtfs_shape_id, ST_MakeLine(geom order by sequence, id)
            from shapes
            where gtfs_shape_id = any($1)
            group by gtfs_shape_id
            having count(*) >= 2
            on conflict (gtfs_shape_id) do nothing
            "#,
        )
        .bind(ids)
        .execute(&mut *self.tx)
        .await
        .context("insert_shape_lines failed")?;

        Ok(res.rows_affected())
    }

    async fn clear_route_shapes(&mut self, route_ids: &[i32]) -> Result<u64> {
        let res = sqlx::query("delete from route_shapes where route_id = any($1)")
            .bind(route_ids)
            .execute(&mut *self.tx)
            .await
            .context("clear_route_shapes failed")?;
        Ok(res.rows_affected())
    }

    async fn insert_route_shapes(&mut self, feed_id: i32, pairs: &[(i32, String)]) -> Result<u64> {
        let route_ids: Vec<i32> = pairs.iter().map(|(r, _)| *r).collect();
        let shape_ids: Vec<&str> = pairs.iter().map(|(_, s)| s.as_str()).collect();

        let res = sqlx::query(
            r#"
            insert into route_shapes (route_id, gtfs_shape_id)
            select t.route_id, t.shape_id
            from unnest($2::int4[], $3::text[]) as t(route_id, shape_id)
            join routes r on r.id = t.route_id
            where r.feed_id = $1 and r.is_active
            on conflict do nothing
            "#,
        )
        .bind(feed_id)
        .bind(&route_ids)
        .bind(&shape_ids)
        .execute(&mut *self.tx)
        .await
        .context("insert_route_shapes failed")?;

        Ok(res.rows_affected())
    }

    async fn update_stop_counts(&mut self, counts: &[(i32, i32)]) -> Result<u64> {
        let ids: Vec<i32> = counts.iter().map(|(id, _)| *id).collect();
        let ns: Vec<i32> = counts.iter().map(|(_, n)| *n).collect();

        let res = sqlx::query(
            r#"
            update routes r set stop_count = t.n
            from unnest($1::int4[], $2::int4[]) as t(id, n)
            where r.id = t.id
              and r.stop_count is distinct from t.n
            "#,
        )
        .bind(&ids)
        .bind(&ns)
        .execute(&mut *self.tx)
        .await
        .context("update_stop_counts failed")?;

        Ok(res.rows_affected())
    }

    async fn update_longest_trip_lengths(
        &mut self,
        feed_id: i32,
        route_ids: Option<&[i32]>,
    ) -> Result<u64> {
        let only: Option<Vec<i32>> = route_ids.map(<[i32]>::to_vec);

        let res = sqlx::query(
            r#"
            update routes r set longest_trip_length_m = m.len
            from (
              select rs.route_id, max(ST_Length(sl.geom::geography)) as len
              from route_shapes rs
              join shape_lines sl on sl.gtfs_shape_id = rs.gtfs_shape_id
              group by rs.route_id
            ) m
            where r.id = m.route_id
              and r.feed_id = $1
              and ($2::int4[] is null or r.id = any($2))
            "#,
        )
        .bind(feed_id)
        .bind(only)
        .execute(&mut *self.tx)
        .await
        .context("update_longest_trip_lengths failed")?;

        Ok(res.rows_affected())
    }

    async fn clear_longest_trip_lengths_without_shapes(&mut self, feed_id: i32) -> Result<u64> {
        let res = sqlx::query(
            r#"
            update routes r set longest_trip_length_m = null
            where r.feed_id = $1
              and r.longest_trip_length_m is not null
              and not exists (
                select 1
                from route_shapes rs
                join shape_lines sl on sl.gtfs_shape_id = rs.gtfs_shape_id
                where rs.route_id = r.id
              )
            "#,
        )
        .bind(feed_id)
        .execute(&mut *self.tx)
        .await
        .context("clear_longest_trip_lengths_without_shapes failed")?;

        Ok(res.rows_affected())
    }

    async fn set_routes_active(&mut self, route_ids: &[i32]) -> Result<u64> {
        let res =
            sqlx::query("update routes set is_active = true where id = any($1) and not is_active")
                .bind(route_ids)
                .execute(&mut *self.tx)
                .await
                .context("set_routes_active failed")?;
        Ok(res.rows_affected())
    }

    async fn deactivate_routes_except(&mut self, feed_id: i32, keep: &[i32]) -> Result<u64> {
        let res = sqlx::query(
            r#"
            update routes set is_active = false
            where feed_id = $1
              and is_active
              and not (id = any($2))
            "#,
        )
        .bind(feed_id)
        .bind(keep)
        .execute(&mut *self.tx)
        .await
        .context("deactivate_routes_except failed")?;
        Ok(res.rows_affected())
    }

    async fn delete_routes_except(&mut self, feed_id: i32, keep: &[i32]) -> Result<u64> {
        sqlx::query(
            r#"
            delete from route_shapes rs
            using routes r
            where rs.route_id = r.id
              and r.feed_id = $1
              and not (r.id = any($2))
            "#,
        )
        .bind(feed_id)
        .bind(keep)
        .execute(&mut *self.tx)
        .await
        .context("delete stale route_shapes failed")?;

        let res = sqlx::query("delete from routes where feed_id = $1 and not (id = any($2))")
            .bind(feed_id)
            .bind(keep)
            .execute(&mut *self.tx)
            .await
            .context("delete stale routes failed")?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl StoreTransaction for PgImportTx {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("commit import failed")
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("rollback import failed")
    }
}
