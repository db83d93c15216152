//! End-to-end flow: request a map through the `Orchestrator`, let a real
//! worker pool compute it against a fake raster-compute client, then poll
//! status and serve a tile.

mod common;

use rusle_core::orchestrator::Orchestrator;
use rusle_core::registry::{AreaType, InMemoryMapRegistry, Status};
use rusle_core::task::{spawn_worker_pool, InMemoryTaskBroker, LoggingCallbackSink};
use std::sync::Arc;
use std::time::Duration;

async fn wait_for_completion(orchestrator: &Orchestrator, fingerprint: &rusle_core::registry::Fingerprint) -> rusle_core::orchestrator::MapStatusResponse {
    for _ in 0..200 {
        let status = orchestrator.task_status(fingerprint).await.unwrap();
        if matches!(status.status, Status::Completed | Status::Failed) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task did not reach a terminal state in time");
}

#[tokio::test]
async fn administrative_request_completes_and_serves_a_tile() {
    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = Arc::new(InMemoryTaskBroker::new());
    let boundaries = Arc::new(common::FixedBoundary(common::square()));
    let storage_root = common::temp_storage_root("admin-flow");

    let orchestrator = Orchestrator::new(
        registry.clone() as Arc<dyn rusle_core::registry::MapRegistry>,
        broker.clone() as Arc<dyn rusle_core::task::TaskBroker>,
        boundaries,
        storage_root.clone(),
    )
    .with_zoom_range((10, 11));

    let workers = spawn_worker_pool(
        2,
        broker.clone(),
        registry.clone(),
        Arc::new(common::fake_raster_client()),
        Arc::new(LoggingCallbackSink),
        storage_root.clone(),
        Duration::from_millis(10),
    );

    let response = orchestrator
        .get_or_queue_administrative(AreaType::Region, "RR-01", 2023, None, None)
        .await
        .unwrap();
    assert_eq!(response.status, Status::Queued);

    let fingerprint = rusle_core::registry::Fingerprint::for_administrative_area(AreaType::Region, "RR-01", 2023, "default");
    let completed = wait_for_completion(&orchestrator, &fingerprint).await;

    assert_eq!(completed.status, Status::Completed);
    assert!(completed.mean_erosion_rate.unwrap() >= 0.0);
    assert!(completed.tile_root.is_some());

    // Pick any tile actually generated under zoom 10 and confirm it serves.
    let record = registry.get(&fingerprint).await.unwrap().unwrap();
    let tile_root = std::path::PathBuf::from(record.tile_root().clone().unwrap());
    let z_dir = tile_root.join("10");
    let x_dir = std::fs::read_dir(&z_dir)
        .unwrap()
        .next()
        .expect("at least one column at zoom 10")
        .unwrap()
        .path();
    let x: u32 = x_dir.file_name().unwrap().to_str().unwrap().parse().unwrap();
    let y_file = std::fs::read_dir(&x_dir).unwrap().next().unwrap().unwrap().path();
    let y: u32 = y_file.file_stem().unwrap().to_str().unwrap().parse().unwrap();

    let bytes = orchestrator.tile_serve(&fingerprint, 10, x, y).await.unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(&bytes[1..4], b"PNG");

    for worker in workers {
        worker.abort();
    }
    std::fs::remove_dir_all(&storage_root).ok();
}

#[tokio::test]
async fn missing_tile_reports_missing_tile_error() {
    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = Arc::new(InMemoryTaskBroker::new());
    let boundaries = Arc::new(common::FixedBoundary(common::square()));
    let storage_root = common::temp_storage_root("missing-tile");

    let orchestrator = Orchestrator::new(
        registry as Arc<dyn rusle_core::registry::MapRegistry>,
        broker as Arc<dyn rusle_core::task::TaskBroker>,
        boundaries,
        storage_root.clone(),
    );

    // A record that has never been requested at all.
    let fingerprint = rusle_core::registry::Fingerprint::for_administrative_area(AreaType::Region, "NEVER-REQUESTED", 2023, "default");
    let result = orchestrator.tile_serve(&fingerprint, 10, 0, 0).await;
    assert!(matches!(result.unwrap_err().kind(), rusle_core::ErrorKind::MissingTile(_)));

    std::fs::remove_dir_all(&storage_root).ok();
}

#[tokio::test]
async fn status_probe_reflects_queue_depth_and_worker_count() {
    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = Arc::new(InMemoryTaskBroker::new());
    let boundaries = Arc::new(common::FixedBoundary(common::square()));
    let storage_root = common::temp_storage_root("status-probe");

    let orchestrator = Orchestrator::new(
        registry as Arc<dyn rusle_core::registry::MapRegistry>,
        broker as Arc<dyn rusle_core::task::TaskBroker>,
        boundaries,
        storage_root.clone(),
    );

    orchestrator
        .get_or_queue_administrative(AreaType::Region, "RR-01", 2023, None, None)
        .await
        .unwrap();

    let probe = orchestrator.status_probe(3).await;
    assert_eq!(probe.queue_depth, 1);
    assert_eq!(probe.worker_count, 3);

    std::fs::remove_dir_all(&storage_root).ok();
}
