//! Optional Postgres-backed [`MapRegistry`] (`postgres` feature).
//!
//! The core never owns the connection pool -- callers construct a
//! `sqlx::PgPool` themselves (configuring TLS, pool size, etc. to their own
//! deployment's needs) and hand it to [`PgMapRegistry::new`].

use super::fingerprint::{AreaType, Fingerprint};
use super::model::{PrecomputedMap, PrecomputedMapBuilder, Status};
use super::store::MapRegistry;
use async_trait::async_trait;
use sqlx::PgPool;

/// A [`MapRegistry`] backed by a `precomputed_maps` table in Postgres.
pub struct PgMapRegistry {
    pool: PgPool,
}

impl PgMapRegistry {
    /// Wraps an existing pool. Does not run migrations; callers are
    /// expected to have applied the `precomputed_maps` table migration.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    area_type: String,
    area_id: String,
    start_year: i32,
    user_id: Option<String>,
    config_hash: String,
    geometry_hash: String,
    status: String,
    task_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    tile_root: Option<String>,
    geotiff_path: Option<String>,
    mean_erosion_rate: Option<f64>,
    erosion_cv: Option<f64>,
    rainfall_slope: Option<f64>,
    rainfall_cv: Option<f64>,
    statistics: Option<sqlx::types::Json<serde_json::Value>>,
    error_message: Option<String>,
    error_type: Option<String>,
    retry_count: i32,
}

fn area_type_to_str(area_type: AreaType) -> &'static str {
    area_type.as_str()
}

fn area_type_from_str(s: &str) -> crate::Result<AreaType> {
    match s {
        "region" => Ok(AreaType::Region),
        "district" => Ok(AreaType::District),
        "custom" => Ok(AreaType::Custom),
        other => Err(crate::Error::invalid_input(format!("unknown area_type in registry row: {other}"))),
    }
}

fn status_to_str(status: Status) -> &'static str {
    match status {
        Status::Queued => "queued",
        Status::Processing => "processing",
        Status::Completed => "completed",
        Status::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> crate::Result<Status> {
    match s {
        "queued" => Ok(Status::Queued),
        "processing" => Ok(Status::Processing),
        "completed" => Ok(Status::Completed),
        "failed" => Ok(Status::Failed),
        other => Err(crate::Error::invalid_input(format!("unknown status in registry row: {other}"))),
    }
}

impl Row {
    fn into_record(self) -> crate::Result<PrecomputedMap> {
        let area_type = area_type_from_str(&self.area_type)?;
        let fingerprint = match area_type {
            AreaType::Region | AreaType::District => {
                Fingerprint::for_administrative_area(area_type, self.area_id, self.start_year, self.config_hash)
            }
            AreaType::Custom => Fingerprint::for_custom_area(
                self.area_id,
                self.start_year,
                self.user_id.unwrap_or_default(),
                self.config_hash,
                self.geometry_hash,
            ),
        };

        PrecomputedMapBuilder::default()
            .fingerprint(fingerprint)
            .status(status_from_str(&self.status)?)
            .task_id(self.task_id)
            .created_at(self.created_at)
            .updated_at(self.updated_at)
            .tile_root(self.tile_root)
            .geotiff_path(self.geotiff_path)
            .mean_erosion_rate(self.mean_erosion_rate)
            .erosion_cv(self.erosion_cv)
            .rainfall_slope(self.rainfall_slope)
            .rainfall_cv(self.rainfall_cv)
            .statistics(self.statistics.map(|json| json.0))
            .error_message(self.error_message)
            .error_type(self.error_type)
            .retry_count(self.retry_count as u32)
            .build()
            .map_err(|e| crate::Error::invalid_input(e.to_string()))
    }
}

#[async_trait]
impl MapRegistry for PgMapRegistry {
    async fn get(&self, fingerprint: &Fingerprint) -> crate::Result<Option<PrecomputedMap>> {
        let row: Option<Row> = sqlx::query_as(
            "SELECT * FROM precomputed_maps
             WHERE area_type = $1 AND area_id = $2 AND start_year = $3
               AND user_id IS NOT DISTINCT FROM $4 AND config_hash = $5 AND geometry_hash = $6",
        )
        .bind(area_type_to_str(*fingerprint.area_type()))
        .bind(fingerprint.area_id())
        .bind(fingerprint.start_year())
        .bind(fingerprint.user_id())
        .bind(fingerprint.config_hash())
        .bind(fingerprint.geometry_hash())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| crate::Error::invalid_input(format!("registry query failed: {e}")))?;

        row.map(Row::into_record).transpose()
    }

    async fn get_or_create(&self, fingerprint: &Fingerprint) -> crate::Result<(PrecomputedMap, bool)> {
        if let Some(existing) = self.get(fingerprint).await? {
            return Ok((existing, false));
        }

        let now = chrono::Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO precomputed_maps
                (area_type, area_id, start_year, user_id, config_hash, geometry_hash, status, created_at, updated_at, retry_count)
             VALUES ($1, $2, $3, $4, $5, $6, 'queued', $7, $7, 0)
             ON CONFLICT (area_type, area_id, start_year, user_id, config_hash, geometry_hash) DO NOTHING",
        )
        .bind(area_type_to_str(*fingerprint.area_type()))
        .bind(fingerprint.area_id())
        .bind(fingerprint.start_year())
        .bind(fingerprint.user_id())
        .bind(fingerprint.config_hash())
        .bind(fingerprint.geometry_hash())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| crate::Error::invalid_input(format!("registry insert failed: {e}")))?
        .rows_affected()
            > 0;

        // Either we just inserted it, or a concurrent writer raced us and
        // the conflict clause made this a no-op -- either way, read back
        // the authoritative row, but only report `created = true` to the
        // caller that actually won the race (otherwise both callers would
        // enqueue a task for the same fingerprint, P1).
        let record = self
            .get(fingerprint)
            .await?
            .ok_or_else(|| crate::Error::conflict("record vanished immediately after insert"))?;
        Ok((record, inserted))
    }

    async fn update(
        &self,
        fingerprint: &Fingerprint,
        mutate: Box<dyn FnOnce(&mut PrecomputedMap) -> crate::Result<()> + Send>,
    ) -> crate::Result<PrecomputedMap> {
        let mut record = self
            .get(fingerprint)
            .await?
            .ok_or_else(|| crate::Error::conflict("no record exists for this fingerprint"))?;
        mutate(&mut record)?;

        sqlx::query(
            "UPDATE precomputed_maps SET
                status = $1, task_id = $2, updated_at = $3, tile_root = $4, geotiff_path = $5,
                mean_erosion_rate = $6, erosion_cv = $7, rainfall_slope = $8, rainfall_cv = $9,
                statistics = $10, error_message = $11, error_type = $12, retry_count = $13
             WHERE area_type = $14 AND area_id = $15 AND start_year = $16
               AND user_id IS NOT DISTINCT FROM $17 AND config_hash = $18 AND geometry_hash = $19",
        )
        .bind(status_to_str(*record.status()))
        .bind(record.task_id())
        .bind(record.updated_at())
        .bind(record.tile_root())
        .bind(record.geotiff_path())
        .bind(record.mean_erosion_rate())
        .bind(record.erosion_cv())
        .bind(record.rainfall_slope())
        .bind(record.rainfall_cv())
        .bind(record.statistics().clone().map(sqlx::types::Json))
        .bind(record.error_message())
        .bind(record.error_type())
        .bind(*record.retry_count() as i32)
        .bind(area_type_to_str(*fingerprint.area_type()))
        .bind(fingerprint.area_id())
        .bind(fingerprint.start_year())
        .bind(fingerprint.user_id())
        .bind(fingerprint.config_hash())
        .bind(fingerprint.geometry_hash())
        .execute(&self.pool)
        .await
        .map_err(|e| crate::Error::invalid_input(format!("registry update failed: {e}")))?;

        Ok(record)
    }

    async fn list_stuck(&self, stuck_after: chrono::Duration) -> crate::Result<Vec<PrecomputedMap>> {
        let threshold = chrono::Utc::now() - stuck_after;
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT * FROM precomputed_maps WHERE status IN ('queued', 'processing') AND updated_at < $1",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| crate::Error::invalid_input(format!("registry query failed: {e}")))?;

        rows.into_iter().map(Row::into_record).collect()
    }
}
