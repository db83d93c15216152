//! Scheduled refresh driver (C8) integration tests: the refresh sweep over
//! a small area catalog, plus the orphan sweep recovering a stuck task.

mod common;

use rusle_core::orchestrator::Orchestrator;
use rusle_core::registry::{AreaType, Fingerprint, InMemoryMapRegistry, MapRegistry, Status};
use rusle_core::scheduler::{refresh_latest_year, sweep_orphans};
use rusle_core::task::{spawn_worker_pool, InMemoryTaskBroker, LoggingCallbackSink, TaskBroker};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn refresh_latest_year_enqueues_every_catalog_area_once() {
    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = Arc::new(InMemoryTaskBroker::new());
    let storage_root = common::temp_storage_root("scheduler-refresh");
    let catalog = Arc::new(common::TwoRegionCatalog);

    let orchestrator = Orchestrator::new(
        registry.clone() as Arc<dyn MapRegistry>,
        broker.clone() as Arc<dyn TaskBroker>,
        catalog.clone(),
        storage_root.clone(),
    );

    let summary = refresh_latest_year(&orchestrator, catalog.as_ref(), 2024, false).await.unwrap();
    assert_eq!(summary.enqueued_count(), 2);
    assert_eq!(summary.error_count(), 0);
    assert_eq!(broker.depth().await, 2);

    // a second refresh, un-forced, must not double-enqueue (both areas are still queued)
    let second = refresh_latest_year(&orchestrator, catalog.as_ref(), 2024, false).await.unwrap();
    assert_eq!(second.enqueued_count(), 0);
    assert_eq!(broker.depth().await, 2);

    std::fs::remove_dir_all(&storage_root).ok();
}

#[tokio::test]
async fn force_refresh_requeues_already_completed_areas() {
    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = Arc::new(InMemoryTaskBroker::new());
    let storage_root = common::temp_storage_root("scheduler-force-refresh");
    let catalog = Arc::new(common::TwoRegionCatalog);

    let orchestrator = Orchestrator::new(
        registry.clone() as Arc<dyn MapRegistry>,
        broker.clone() as Arc<dyn TaskBroker>,
        catalog.clone(),
        storage_root.clone(),
    )
    .with_zoom_range((12, 12));

    let workers = spawn_worker_pool(
        2,
        broker.clone(),
        registry.clone(),
        Arc::new(common::fake_raster_client()),
        Arc::new(LoggingCallbackSink),
        storage_root.clone(),
        Duration::from_millis(10),
    );

    refresh_latest_year(&orchestrator, catalog.as_ref(), 2024, false).await.unwrap();

    let rr01 = Fingerprint::for_administrative_area(AreaType::Region, "RR-01", 2024, "default");
    let rr02 = Fingerprint::for_administrative_area(AreaType::Region, "RR-02", 2024, "default");
    for fingerprint in [&rr01, &rr02] {
        for _ in 0..200 {
            let record = registry.get(fingerprint).await.unwrap().unwrap();
            if matches!(record.status(), Status::Completed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(*registry.get(fingerprint).await.unwrap().unwrap().status(), Status::Completed);
    }

    // without --force, completed areas are left alone
    let unforced = refresh_latest_year(&orchestrator, catalog.as_ref(), 2024, false).await.unwrap();
    assert_eq!(unforced.enqueued_count(), 0);

    // with --force, both completed areas bounce back to queued
    let forced = refresh_latest_year(&orchestrator, catalog.as_ref(), 2024, true).await.unwrap();
    assert_eq!(forced.enqueued_count(), 2);

    for worker in workers {
        worker.abort();
    }
    std::fs::remove_dir_all(&storage_root).ok();
}

#[tokio::test]
async fn orphan_sweep_requeues_a_stuck_processing_record_but_not_a_fresh_one() {
    let registry = Arc::new(InMemoryMapRegistry::new());
    let broker = InMemoryTaskBroker::new();

    let stuck = Fingerprint::for_administrative_area(AreaType::Region, "RR-STUCK", 2024, "default");
    let fresh = Fingerprint::for_administrative_area(AreaType::Region, "RR-FRESH", 2024, "default");

    registry.get_or_create(&stuck).await.unwrap();
    registry.update(&stuck, Box::new(|r| r.transition(Status::Processing))).await.unwrap();

    registry.get_or_create(&fresh).await.unwrap();
    registry.update(&fresh, Box::new(|r| r.transition(Status::Processing))).await.unwrap();

    // Every record here is "fresh" by wall-clock, so a generous threshold sweeps nothing...
    let none_stuck = sweep_orphans(registry.as_ref(), &broker, chrono::Duration::days(1)).await.unwrap();
    assert!(none_stuck.is_empty());
    assert_eq!(*registry.get(&stuck).await.unwrap().unwrap().status(), Status::Processing);

    // ...while a threshold in the past treats every open record as stuck.
    let all_stuck = sweep_orphans(registry.as_ref(), &broker, chrono::Duration::seconds(-1)).await.unwrap();
    assert_eq!(all_stuck.len(), 2);
    assert_eq!(*registry.get(&stuck).await.unwrap().unwrap().status(), Status::Queued);
    assert_eq!(*registry.get(&fresh).await.unwrap().unwrap().status(), Status::Queued);
}
