//! `rusle-refresh`: the scheduled refresh driver's CLI entry point (spec §6.5).
//!
//! Reads a JSON area manifest (administrative area ids plus their boundary
//! geometry), re-requests each area's map for `--year`, sweeps orphaned
//! tasks, and exits non-zero if any area failed to refresh.

use clap::{Parser, ValueEnum};
use rusle_core::config::EnvConfig;
use rusle_core::geometry::AreaGeometry;
use rusle_core::orchestrator::{AdministrativeBoundaryLookup, Orchestrator};
use rusle_core::raster::{HttpRasterServiceClient, RasterServiceClient};
use rusle_core::registry::{AreaType, InMemoryMapRegistry};
use rusle_core::scheduler::{refresh_latest_year, sweep_orphans, AreaCatalog};
use rusle_core::task::{spawn_worker_pool, InMemoryTaskBroker, LoggingCallbackSink};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "rusle-refresh", about = "Refresh precomputed RUSLE maps for the current period")]
struct Cli {
    /// Start year of the period to refresh.
    #[arg(long)]
    year: i32,

    /// Restrict the refresh to a single area type; defaults to all.
    #[arg(long, value_enum, default_value_t = AreaTypeArg::All)]
    r#type: AreaTypeArg,

    /// Recompute even areas that already have a completed map.
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Path to the JSON area manifest (administrative areas and their boundary geometry).
    #[arg(long, env = "RUSLE_AREA_MANIFEST")]
    manifest: PathBuf,

    /// Base URL of the raster-compute service.
    #[arg(long, env = "RUSLE_RASTER_SERVICE_URL")]
    raster_service_url: Url,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AreaTypeArg {
    All,
    Region,
    District,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    area_type: AreaType,
    geometry: geojson::Geometry,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    areas: HashMap<String, ManifestEntry>,
}

struct ManifestCatalog {
    entries: HashMap<String, ManifestEntry>,
    only: Option<AreaType>,
}

#[async_trait::async_trait]
impl AreaCatalog for ManifestCatalog {
    async fn list_areas(&self) -> rusle_core::Result<Vec<(AreaType, String)>> {
        Ok(self
            .entries
            .iter()
            .filter(|(_, entry)| self.only.is_none_or(|only| entry.area_type == only))
            .map(|(area_id, entry)| (entry.area_type, area_id.clone()))
            .collect())
    }
}

#[async_trait::async_trait]
impl AdministrativeBoundaryLookup for ManifestCatalog {
    async fn boundary(&self, _area_type: AreaType, area_id: &str) -> rusle_core::Result<AreaGeometry> {
        let entry = self
            .entries
            .get(area_id)
            .ok_or_else(|| rusle_core::Error::invalid_input(format!("unknown area id: {area_id}")))?;
        AreaGeometry::from_geojson(&entry.geometry)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let env = EnvConfig::global();

    let manifest_bytes = match std::fs::read(&cli.manifest) {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!(%error, path = %cli.manifest.display(), "failed to read area manifest");
            return ExitCode::FAILURE;
        }
    };
    let manifest: Manifest = match serde_json::from_slice(&manifest_bytes) {
        Ok(manifest) => manifest,
        Err(error) => {
            tracing::error!(%error, "failed to parse area manifest");
            return ExitCode::FAILURE;
        }
    };

    let only = match cli.r#type {
        AreaTypeArg::All => None,
        AreaTypeArg::Region => Some(AreaType::Region),
        AreaTypeArg::District => Some(AreaType::District),
    };
    let catalog = Arc::new(ManifestCatalog {
        entries: manifest.areas,
        only,
    });

    let raster_client: Arc<dyn RasterServiceClient> = match HttpRasterServiceClient::from_env(cli.raster_service_url.as_str()) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            tracing::error!(%error, "failed to build raster-compute client");
            return ExitCode::FAILURE;
        }
    };

    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = Arc::new(InMemoryTaskBroker::new());
    let storage_root = PathBuf::from(&env.storage_root);

    let orchestrator = Orchestrator::new(registry.clone(), broker.clone(), catalog.clone(), storage_root.clone());

    let workers = spawn_worker_pool(
        env.task_runtime_workers,
        broker.clone(),
        registry.clone(),
        raster_client,
        Arc::new(LoggingCallbackSink),
        storage_root,
        std::time::Duration::from_secs(2),
    );

    let summary = match refresh_latest_year(&orchestrator, catalog.as_ref(), cli.year, cli.force).await {
        Ok(summary) => summary,
        Err(error) => {
            tracing::error!(%error, "refresh run failed");
            for worker in workers {
                worker.abort();
            }
            return ExitCode::FAILURE;
        }
    };

    let orphan_outcomes = match sweep_orphans(
        registry.as_ref(),
        broker.as_ref(),
        chrono::Duration::seconds(env.orphan_stuck_after_secs as i64),
    )
    .await
    {
        Ok(outcomes) => outcomes,
        Err(error) => {
            tracing::error!(%error, "orphan sweep failed");
            Vec::new()
        }
    };

    tracing::info!(
        enqueued = summary.enqueued_count(),
        errors = summary.error_count(),
        orphans_requeued = orphan_outcomes.len(),
        "refresh cycle finished"
    );

    for worker in workers {
        worker.abort();
    }

    if summary.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
