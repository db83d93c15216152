//! Worker pool (C5): pulls queued tasks and runs engine → exporter → tile
//! pyramid end to end, reporting lifecycle events as it goes.

use super::broker::{Task, TaskBroker};
use super::callbacks::{CompletionStats, TaskCallbackSink, TaskEvent};
use crate::engine::compute;
use crate::export::write_geotiff;
use crate::geometry::analyze;
use crate::raster::RasterServiceClient;
use crate::registry::{MapRegistry, Status};
use crate::tiles::generate_pyramid;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Runs `workers` concurrent worker loops against `broker`, each pulling
/// tasks until the broker is empty and then polling at `poll_interval`.
///
/// Returns a [`tokio::task::JoinHandle`] per worker; callers (the
/// orchestrator, or the scheduler's refresh driver) own their lifetime and
/// should abort them on shutdown.
pub fn spawn_worker_pool(
    workers: usize,
    broker: Arc<dyn TaskBroker>,
    registry: Arc<dyn MapRegistry>,
    raster_client: Arc<dyn RasterServiceClient>,
    callbacks: Arc<dyn TaskCallbackSink>,
    storage_root: PathBuf,
    poll_interval: Duration,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..workers)
        .map(|worker_index| {
            let broker = broker.clone();
            let registry = registry.clone();
            let raster_client = raster_client.clone();
            let callbacks = callbacks.clone();
            let storage_root = storage_root.clone();

            tokio::spawn(async move {
                tracing::info!(worker_index, "worker loop starting");
                loop {
                    match broker.pull().await {
                        Ok(Some(task)) => {
                            run_task(
                                task,
                                broker.as_ref(),
                                registry.as_ref(),
                                raster_client.as_ref(),
                                callbacks.as_ref(),
                                &storage_root,
                            )
                            .await;
                        }
                        Ok(None) => tokio::time::sleep(poll_interval).await,
                        Err(error) => {
                            tracing::error!(worker_index, %error, "broker pull failed");
                            tokio::time::sleep(poll_interval).await;
                        }
                    }
                }
            })
        })
        .collect()
}

#[tracing::instrument(skip(task, broker, registry, raster_client, callbacks, storage_root))]
async fn run_task(
    task: Task,
    broker: &dyn TaskBroker,
    registry: &dyn MapRegistry,
    raster_client: &dyn RasterServiceClient,
    callbacks: &dyn TaskCallbackSink,
    storage_root: &std::path::Path,
) {
    let Task { task_id, request } = task;
    let fingerprint = request.fingerprint.clone();

    let transition_result = registry
        .update(
            &fingerprint,
            Box::new({
                let task_id = task_id.clone();
                move |record| {
                    record.set_task_id(Some(task_id));
                    record.transition(Status::Processing)
                }
            }),
        )
        .await;

    if let Err(error) = transition_result {
        tracing::error!(%error, "failed to mark task processing, abandoning");
        broker.complete(&task_id).await;
        return;
    }

    let _ = callbacks
        .on_event(TaskEvent::Started {
            task_id: task_id.clone(),
            fingerprint: fingerprint.clone(),
        })
        .await;

    match run_computation(&request, raster_client, storage_root, &fingerprint).await {
        Ok((tile_root, geotiff_path, stats)) => {
            let update_result = registry
                .update(
                    &fingerprint,
                    Box::new({
                        let tile_root = tile_root.clone();
                        let geotiff_path = geotiff_path.clone();
                        let statistics = stats.statistics.clone();
                        let mean_erosion_rate = stats.mean_erosion_rate;
                        let erosion_cv = stats.erosion_cv;
                        let rainfall_slope = stats.rainfall_slope;
                        let rainfall_cv = stats.rainfall_cv;
                        move |record| {
                            record.set_tile_root(Some(tile_root));
                            record.set_geotiff_path(Some(geotiff_path));
                            record.set_mean_erosion_rate(Some(mean_erosion_rate));
                            record.set_erosion_cv(Some(erosion_cv));
                            record.set_rainfall_slope(Some(rainfall_slope));
                            record.set_rainfall_cv(Some(rainfall_cv));
                            record.set_statistics(Some(statistics));
                            record.transition(Status::Completed)
                        }
                    }),
                )
                .await;

            if let Err(error) = update_result {
                tracing::error!(%error, "failed to persist completion");
                broker.complete(&task_id).await;
                return;
            }

            broker.complete(&task_id).await;
            let _ = callbacks
                .on_event(TaskEvent::Completed {
                    task_id,
                    fingerprint,
                    stats,
                })
                .await;
        }
        Err(error) => {
            let message = error.to_string();
            let error_type = error.error_type().to_string();
            let update_result = registry
                .update(
                    &fingerprint,
                    Box::new({
                        let message = message.clone();
                        let error_type = error_type.clone();
                        move |record| {
                            record.set_error_message(Some(message));
                            record.set_error_type(Some(error_type));
                            record.transition(Status::Failed)
                        }
                    }),
                )
                .await;

            if let Err(update_error) = update_result {
                tracing::error!(%update_error, "failed to persist failure");
            }

            broker.complete(&task_id).await;
            let _ = callbacks
                .on_event(TaskEvent::Failed {
                    task_id,
                    fingerprint,
                    message,
                    error_type,
                })
                .await;
        }
    }
}

async fn run_computation(
    request: &super::broker::TaskRequest,
    raster_client: &dyn RasterServiceClient,
    storage_root: &std::path::Path,
    fingerprint: &crate::registry::Fingerprint,
) -> crate::Result<(String, String, CompletionStats)> {
    let analysis = analyze(&request.geometry, request.caller_grid, &request.effective_config.complexity)?;

    let result = compute(
        raster_client,
        &request.geometry,
        request.start_year,
        &request.effective_config,
        analysis.params(),
        *analysis.area_km2(),
    )
    .await?;

    // Filesystem layout (spec §6.3):
    //   geotiffs/{tile_storage_key}/{period_label}/erosion_{period_label}.tif
    //   tiles/{tile_storage_key}/{period_label}/{z}/{x}/{y}.png
    let storage_key = fingerprint.tile_storage_key();
    let period_label = fingerprint.period_label();
    let geometry_hash = fingerprint.geometry_hash().clone();
    let geometry = request.geometry.clone();
    let (min_zoom, max_zoom) = request.zoom_range;
    let storage_root = storage_root.to_path_buf();

    // GeoTIFF encoding and PNG tile rendering are CPU/disk-bound, not
    // async I/O -- run them on the blocking thread pool so they don't
    // starve other workers' `broker.pull()` polling on the same runtime.
    let result_for_export = result.clone();
    let (tile_root, geotiff_path) = tokio::task::spawn_blocking(move || -> crate::Result<(PathBuf, PathBuf)> {
        let result = result_for_export;
        let geotiff_dir = storage_root.join("geotiffs").join(&storage_key).join(&period_label);
        std::fs::create_dir_all(&geotiff_dir)?;

        let geotiff_path = geotiff_dir.join(format!("erosion_{period_label}.tif"));
        let grid = *result.grid();
        let pixels: Vec<f32> = result.samples().iter().map(|s| *s.soil_loss() as f32).collect();
        write_geotiff(&geotiff_path, &pixels, grid.cols, grid.rows, *result.bbox())?;

        let tile_root = storage_root.join("tiles").join(&storage_key).join(&period_label);
        std::fs::create_dir_all(&tile_root)?;
        generate_pyramid(&tile_root, &geometry, &result, min_zoom, max_zoom, &geometry_hash)?;

        Ok((tile_root, geotiff_path))
    })
    .await
    .map_err(|e| crate::error::RasterError::new(format!("export task panicked: {e}")))??;

    // erosionCV/rainfallCV are percentages (spec §3.2/P7: `std_dev / mean *
    // 100`), not the raw `cv()` ratio, and rainfallSlope is the trend
    // expressed as a percentage of mean annual rainfall, not the raw
    // mm/year trend -- these flat columns must agree with the equivalent
    // fields inside `statistics_bundle()`.
    let mean = *result.stats().mean();
    let std_dev = *result.stats().std_dev();
    let erosion_cv = if mean != 0.0 { std_dev / mean * 100.0 } else { f64::NAN };

    let stats = CompletionStats {
        mean_erosion_rate: mean,
        erosion_cv,
        rainfall_slope: result.rainfall_slope_percent(),
        rainfall_cv: *result.rainfall().cv() * 100.0,
        statistics: result.statistics_bundle(),
    };

    Ok((
        tile_root.to_string_lossy().into_owned(),
        geotiff_path.to_string_lossy().into_owned(),
        stats,
    ))
}
