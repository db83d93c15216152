//! Orchestrator / Service API (C7): the single entry point tying the
//! config resolver, registry, broker, and tile storage together.

use super::responses::{MapStatusResponse, RuntimeStatusResponse};
use crate::config::{effective_config, hash_overrides, Overrides, RusleDefaults, DEFAULTS_VERSION};
use crate::geometry::{geometry_hash, AreaGeometry, Grid};
use crate::registry::{AreaType, Fingerprint, MapRegistry, PrecomputedMap};
use crate::task::{TaskBroker, TaskRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves a canonical administrative area id to its boundary geometry.
///
/// The core does not ship a gazetteer; callers (the HTTP layer, typically)
/// implement this against whatever authoritative boundary store backs
/// their deployment (a shapefile cache, a database, a third-party API).
#[async_trait]
pub trait AdministrativeBoundaryLookup: Send + Sync {
    /// Looks up the boundary for `(area_type, area_id)`.
    async fn boundary(&self, area_type: AreaType, area_id: &str) -> crate::Result<AreaGeometry>;
}

/// Default inclusive zoom range generated for every map (spec §4.4: `[6, max_zoom]`, `max_zoom` default 10).
pub const DEFAULT_ZOOM_RANGE: (u32, u32) = (6, 10);

/// The Orchestrator: the core's public service surface (spec §6).
pub struct Orchestrator {
    registry: Arc<dyn MapRegistry>,
    broker: Arc<dyn TaskBroker>,
    boundaries: Arc<dyn AdministrativeBoundaryLookup>,
    storage_root: PathBuf,
    zoom_range: (u32, u32),
}

impl Orchestrator {
    /// Builds an orchestrator over the given registry, broker, and
    /// administrative-boundary lookup.
    pub fn new(
        registry: Arc<dyn MapRegistry>,
        broker: Arc<dyn TaskBroker>,
        boundaries: Arc<dyn AdministrativeBoundaryLookup>,
        storage_root: PathBuf,
    ) -> Self {
        Self {
            registry,
            broker,
            boundaries,
            storage_root,
            zoom_range: DEFAULT_ZOOM_RANGE,
        }
    }

    /// Overrides the default zoom range tiles are generated at.
    pub fn with_zoom_range(mut self, zoom_range: (u32, u32)) -> Self {
        self.zoom_range = zoom_range;
        self
    }

    fn resolve_config(&self, overrides: Option<&Overrides>) -> (RusleDefaults, String) {
        let raw = overrides.cloned().unwrap_or(serde_json::Value::Null);
        let effective = effective_config(&raw);
        let defaults_schema = RusleDefaults::default().to_value();
        let filtered = crate::config::filter_overrides(&raw, &defaults_schema);
        let hash = hash_overrides(&filtered, DEFAULTS_VERSION);
        let resolved: RusleDefaults =
            serde_json::from_value(effective).expect("effective_config always matches RusleDefaults's shape");
        (resolved, hash)
    }

    /// `get_or_queue` for a canonical administrative area (region/district):
    /// returns the existing record if one matches the fingerprint,
    /// otherwise creates one and enqueues a task (spec §4.2/§6.1).
    #[tracing::instrument(skip(self, overrides))]
    pub async fn get_or_queue_administrative(
        &self,
        area_type: AreaType,
        area_id: &str,
        start_year: i32,
        caller_grid: Option<Grid>,
        overrides: Option<&Overrides>,
    ) -> crate::Result<MapStatusResponse> {
        if matches!(area_type, AreaType::Custom) {
            return Err(crate::Error::invalid_input(
                "use get_or_queue_custom for area_type=custom",
            ));
        }

        let (effective_config, config_hash) = self.resolve_config(overrides);
        let fingerprint = Fingerprint::for_administrative_area(area_type, area_id, start_year, config_hash);

        let (record, created) = self.registry.get_or_create(&fingerprint).await?;
        if created {
            let geometry = self.boundaries.boundary(area_type, area_id).await?;
            self.enqueue(&fingerprint, geometry, start_year, effective_config, caller_grid)
                .await?;
            return Ok(MapStatusResponse::build(&record, &fingerprint, self.zoom_range));
        }

        if matches!(record.status(), crate::registry::Status::Failed) {
            let geometry = self.boundaries.boundary(area_type, area_id).await?;
            let retried = self.retry_failed(&fingerprint, geometry, start_year, effective_config, caller_grid).await?;
            return Ok(MapStatusResponse::build(&retried, &fingerprint, self.zoom_range));
        }

        Ok(MapStatusResponse::build(&record, &fingerprint, self.zoom_range))
    }

    /// `get_or_queue` for a caller-submitted custom boundary (spec §4.2,
    /// §6.1): the geometry hash folds into the fingerprint so two
    /// submissions of the same boundary by the same user for the same
    /// year/config collapse onto one record.
    #[tracing::instrument(skip(self, geometry, overrides))]
    pub async fn get_or_queue_custom(
        &self,
        area_id: &str,
        start_year: i32,
        user_id: &str,
        geometry: AreaGeometry,
        caller_grid: Option<Grid>,
        overrides: Option<&Overrides>,
    ) -> crate::Result<MapStatusResponse> {
        let (effective_config, config_hash) = self.resolve_config(overrides);
        let geom_hash = geometry_hash(&geometry);
        let fingerprint = Fingerprint::for_custom_area(area_id, start_year, user_id, config_hash, geom_hash);

        let (record, created) = self.registry.get_or_create(&fingerprint).await?;
        if created {
            self.enqueue(&fingerprint, geometry, start_year, effective_config, caller_grid)
                .await?;
            return Ok(MapStatusResponse::build(&record, &fingerprint, self.zoom_range));
        }

        if matches!(record.status(), crate::registry::Status::Failed) {
            let retried = self.retry_failed(&fingerprint, geometry, start_year, effective_config, caller_grid).await?;
            return Ok(MapStatusResponse::build(&retried, &fingerprint, self.zoom_range));
        }

        Ok(MapStatusResponse::build(&record, &fingerprint, self.zoom_range))
    }

    /// Retry policy on `failed` (spec §4.7, L3, scenario 6): transitions a
    /// `Failed` record back to `Queued`, clears `error_message`, and
    /// enqueues a fresh task in its place.
    async fn retry_failed(
        &self,
        fingerprint: &Fingerprint,
        geometry: AreaGeometry,
        start_year: i32,
        effective_config: RusleDefaults,
        caller_grid: Option<Grid>,
    ) -> crate::Result<PrecomputedMap> {
        let record = self
            .registry
            .update(
                fingerprint,
                Box::new(|record| {
                    record.transition(crate::registry::Status::Queued)?;
                    record.set_error_message(None);
                    record.set_error_type(None);
                    Ok(())
                }),
            )
            .await?;
        self.enqueue(fingerprint, geometry, start_year, effective_config, caller_grid).await?;
        Ok(record)
    }

    async fn enqueue(
        &self,
        fingerprint: &Fingerprint,
        geometry: AreaGeometry,
        start_year: i32,
        effective_config: RusleDefaults,
        caller_grid: Option<Grid>,
    ) -> crate::Result<()> {
        let request = TaskRequest {
            fingerprint: fingerprint.clone(),
            geometry,
            start_year,
            effective_config,
            caller_grid,
            zoom_range: self.zoom_range,
        };
        let task_id = self.broker.enqueue(request).await?;

        self.registry
            .update(
                fingerprint,
                Box::new(move |record| {
                    record.set_task_id(Some(task_id));
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }

    /// Forces a completed or failed administrative area back to `Queued`
    /// and re-enqueues it (spec §6.5 `--force`), even though it already has
    /// a result. A no-op if no record exists yet, or if one is already
    /// `Queued`/`Processing` (the scheduled refresh driver calls this once
    /// per area per run and should never double-enqueue).
    #[tracing::instrument(skip(self))]
    pub async fn force_requeue(&self, area_type: AreaType, area_id: &str, start_year: i32) -> crate::Result<()> {
        let (_, config_hash) = self.resolve_config(None);
        let fingerprint = Fingerprint::for_administrative_area(area_type, area_id, start_year, config_hash);

        let Some(existing) = self.registry.get(&fingerprint).await? else {
            return Ok(());
        };
        if !matches!(existing.status(), crate::registry::Status::Completed | crate::registry::Status::Failed) {
            return Ok(());
        }

        let geometry = self.boundaries.boundary(area_type, area_id).await?;
        let effective_config = effective_config(&serde_json::Value::Null);
        let effective_config: RusleDefaults =
            serde_json::from_value(effective_config).expect("effective_config always matches RusleDefaults's shape");

        self.registry
            .update(&fingerprint, Box::new(|record| Ok(record.force_requeue())))
            .await?;
        self.enqueue(&fingerprint, geometry, start_year, effective_config, None).await
    }

    /// Returns the current status/results for a fingerprint (spec §6.2),
    /// erroring if no such record has ever been created.
    pub async fn task_status(&self, fingerprint: &Fingerprint) -> crate::Result<MapStatusResponse> {
        let record = self
            .registry
            .get(fingerprint)
            .await?
            .ok_or_else(|| crate::Error::missing_tile("no map has been requested for this fingerprint"))?;
        Ok(MapStatusResponse::build(&record, fingerprint, self.zoom_range))
    }

    /// Serves raw tile bytes for `(z, x, y)` from a completed map's tile
    /// pyramid (spec §6.3), erroring with `MissingTile` if the map is not
    /// `Completed` or the specific tile file does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn tile_serve(&self, fingerprint: &Fingerprint, z: u32, x: u32, y: u32) -> crate::Result<Vec<u8>> {
        let record = self
            .registry
            .get(fingerprint)
            .await?
            .ok_or_else(|| crate::Error::missing_tile("no map has been requested for this fingerprint"))?;

        let tile_root = record
            .tile_root()
            .clone()
            .ok_or_else(|| crate::Error::missing_tile("map has not completed computation yet"))?;

        let tile_path = Path::new(&tile_root).join(z.to_string()).join(x.to_string()).join(format!("{y}.png"));

        tokio::fs::read(&tile_path)
            .await
            .map_err(|_| crate::Error::missing_tile(format!("tile {z}/{x}/{y} does not exist")))
    }

    /// A lightweight snapshot of the task runtime (spec §6.4).
    pub async fn status_probe(&self, worker_count: usize) -> RuntimeStatusResponse {
        RuntimeStatusResponse {
            queue_depth: self.broker.depth().await,
            worker_count,
        }
    }

    /// The storage root tile/geotiff paths are written under.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// The underlying registry, for callers (the scheduler's orphan sweep)
    /// that need direct access beyond the orchestrator's own operations.
    pub fn registry(&self) -> &Arc<dyn MapRegistry> {
        &self.registry
    }

    /// The underlying broker, for callers (a worker-pool supervisor) that
    /// need direct access beyond the orchestrator's own operations.
    pub fn broker(&self) -> &Arc<dyn TaskBroker> {
        &self.broker
    }
}
