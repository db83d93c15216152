//! Task lifecycle callbacks (spec §5 `task_started`/`task_complete`/`task_failed`).

use crate::registry::Fingerprint;
use async_trait::async_trait;

/// A soil-loss summary emitted on successful completion, mirroring the
/// fields the orchestrator (C7) persists to the registry.
#[derive(Debug, Clone)]
pub struct CompletionStats {
    /// Mean annual erosion rate, t/ha/yr.
    pub mean_erosion_rate: f64,
    /// Coefficient of variation of the erosion rate.
    pub erosion_cv: f64,
    /// Rainfall trend slope, mm/year².
    pub rainfall_slope: f64,
    /// Rainfall coefficient of variation.
    pub rainfall_cv: f64,
    /// The full statistics bundle (spec §3.2): `rusle_factors`,
    /// `severity_distribution`, `rainfallStatistics`, and the aliased
    /// aggregate fields, as one JSON value for storage and API exposure.
    pub statistics: serde_json::Value,
}

/// A task lifecycle event, emitted by the worker pool at each transition.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A worker picked up the task and began computing.
    Started {
        /// The task's id.
        task_id: String,
        /// The fingerprint being computed.
        fingerprint: Fingerprint,
    },
    /// The task finished successfully.
    Completed {
        /// The task's id.
        task_id: String,
        /// The fingerprint that was computed.
        fingerprint: Fingerprint,
        /// Summary statistics from the completed computation.
        stats: CompletionStats,
    },
    /// The task failed.
    Failed {
        /// The task's id.
        task_id: String,
        /// The fingerprint that failed.
        fingerprint: Fingerprint,
        /// A human-readable failure message.
        message: String,
        /// Structured failure discriminant, e.g. `"NoDataAvailable"` (spec §4.5/§7, scenario 6).
        error_type: String,
    },
}

/// Receives [`TaskEvent`]s as the worker pool emits them. The orchestrator
/// implements this to keep the registry in sync; tests can substitute a
/// sink that just records events.
#[async_trait]
pub trait TaskCallbackSink: Send + Sync {
    /// Handles one lifecycle event.
    async fn on_event(&self, event: TaskEvent) -> crate::Result<()>;
}

/// A [`TaskCallbackSink`] that only logs -- useful as a default when no
/// registry bookkeeping is needed (e.g. a dry-run CLI invocation).
pub struct LoggingCallbackSink;

#[async_trait]
impl TaskCallbackSink for LoggingCallbackSink {
    async fn on_event(&self, event: TaskEvent) -> crate::Result<()> {
        match event {
            TaskEvent::Started { task_id, fingerprint } => {
                tracing::info!(task_id = %task_id, ?fingerprint, "task started");
            }
            TaskEvent::Completed { task_id, fingerprint, stats } => {
                tracing::info!(task_id = %task_id, ?fingerprint, ?stats, "task completed");
            }
            TaskEvent::Failed { task_id, fingerprint, message, error_type } => {
                tracing::warn!(task_id = %task_id, ?fingerprint, %message, %error_type, "task failed");
            }
        }
        Ok(())
    }
}
