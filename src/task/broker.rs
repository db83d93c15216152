//! Task enqueue/pull (C5): the broker half of the background task runtime.

use crate::config::RusleDefaults;
use crate::geometry::{AreaGeometry, Grid};
use crate::registry::Fingerprint;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Everything a worker needs to run one precomputation end to end, already
/// resolved by the orchestrator (effective config, parsed geometry) so the
/// broker/worker never re-parse caller input.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// The fingerprint this task is computing a map for.
    pub fingerprint: Fingerprint,
    /// The resolved area geometry (administrative boundary or custom upload).
    pub geometry: AreaGeometry,
    /// The period's start year.
    pub start_year: i32,
    /// The fully resolved (defaults + overrides) RUSLE configuration.
    pub effective_config: RusleDefaults,
    /// Caller-forced sampling grid, if any (see `geometry::analyze`).
    pub caller_grid: Option<Grid>,
    /// Inclusive zoom range to generate tiles for.
    pub zoom_range: (u32, u32),
}

/// A queued unit of work: a generated task id plus its request.
#[derive(Debug, Clone)]
pub struct Task {
    /// Opaque task identifier, returned to callers for status polling.
    pub task_id: String,
    /// The work to perform.
    pub request: TaskRequest,
}

/// Abstraction over the task queue. The task runtime (C5) depends on this
/// trait so a future multi-process deployment can swap in a real broker
/// (Redis, SQS, ...) without touching worker logic.
#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Enqueues `request` and returns its generated task id.
    async fn enqueue(&self, request: TaskRequest) -> crate::Result<String>;

    /// Pulls the next queued task, if any, removing it from the queue.
    async fn pull(&self) -> crate::Result<Option<Task>>;

    /// Current queue depth, for the status probe (spec §6.4).
    async fn depth(&self) -> usize;

    /// Whether `task_id` is still known to the broker -- queued or
    /// in-flight. The orphan sweep (C8, spec §4.8) only force-requeues a
    /// stuck `Processing` record once the broker no longer recognizes its
    /// task id, so a genuinely slow-but-running task is never
    /// double-enqueued.
    async fn is_known(&self, task_id: &str) -> bool;

    /// Releases `task_id` from the broker's in-flight bookkeeping once a
    /// worker has finished with it (successfully or not).
    async fn complete(&self, task_id: &str);
}

/// An in-process FIFO [`TaskBroker`].
#[derive(Default)]
pub struct InMemoryTaskBroker {
    queue: Arc<Mutex<VecDeque<Task>>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryTaskBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskBroker for InMemoryTaskBroker {
    #[tracing::instrument(skip(self, request))]
    async fn enqueue(&self, request: TaskRequest) -> crate::Result<String> {
        let task_id = Uuid::new_v4().to_string();
        let task = Task {
            task_id: task_id.clone(),
            request,
        };
        self.queue.lock().await.push_back(task);
        tracing::info!(task_id = %task_id, "enqueued task");
        Ok(task_id)
    }

    async fn pull(&self) -> crate::Result<Option<Task>> {
        let task = self.queue.lock().await.pop_front();
        if let Some(task) = &task {
            self.in_flight.lock().await.insert(task.task_id.clone());
        }
        Ok(task)
    }

    async fn depth(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn is_known(&self, task_id: &str) -> bool {
        if self.in_flight.lock().await.contains(task_id) {
            return true;
        }
        self.queue.lock().await.iter().any(|task| task.task_id == task_id)
    }

    async fn complete(&self, task_id: &str) {
        self.in_flight.lock().await.remove(task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AreaType;

    fn request() -> TaskRequest {
        TaskRequest {
            fingerprint: Fingerprint::for_administrative_area(AreaType::Region, "RR-01", 2023, "default"),
            geometry: AreaGeometry::from_geojson(&geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![68.0, 38.0],
                vec![68.1, 38.0],
                vec![68.1, 38.1],
                vec![68.0, 38.1],
                vec![68.0, 38.0],
            ]])))
            .unwrap(),
            start_year: 2023,
            effective_config: RusleDefaults::default(),
            caller_grid: None,
            zoom_range: (8, 14),
        }
    }

    #[tokio::test]
    async fn enqueue_then_pull_returns_the_same_task() {
        let broker = InMemoryTaskBroker::new();
        let task_id = broker.enqueue(request()).await.unwrap();

        let task = broker.pull().await.unwrap().unwrap();
        assert_eq!(task.task_id, task_id);
        assert!(broker.pull().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn depth_reflects_queue_size() {
        let broker = InMemoryTaskBroker::new();
        assert_eq!(broker.depth().await, 0);
        broker.enqueue(request()).await.unwrap();
        broker.enqueue(request()).await.unwrap();
        assert_eq!(broker.depth().await, 2);
        broker.pull().await.unwrap();
        assert_eq!(broker.depth().await, 1);
    }

    #[tokio::test]
    async fn pulled_task_stays_known_until_completed() {
        let broker = InMemoryTaskBroker::new();
        let task_id = broker.enqueue(request()).await.unwrap();
        assert!(broker.is_known(&task_id).await);

        broker.pull().await.unwrap();
        assert!(broker.is_known(&task_id).await);

        broker.complete(&task_id).await;
        assert!(!broker.is_known(&task_id).await);
    }

    #[tokio::test]
    async fn unknown_task_id_reports_unknown() {
        let broker = InMemoryTaskBroker::new();
        assert!(!broker.is_known("nonexistent").await);
    }
}
