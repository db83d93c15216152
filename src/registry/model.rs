//! The precomputed-map record and its task state machine (spec §4.6).

use super::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a precomputed map (spec §4.6: `queued -> processing ->
/// {completed, failed}`, with `failed -> queued` the only retry edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Enqueued, not yet picked up by a worker.
    Queued,
    /// A worker is actively computing this map.
    Processing,
    /// Computation finished successfully; tiles are servable.
    Completed,
    /// Computation failed; eligible for retry back to `Queued`.
    Failed,
}

impl Status {
    /// Whether `self -> next` is a legal state-machine transition.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Queued, Status::Processing)
                | (Status::Processing, Status::Completed)
                | (Status::Processing, Status::Failed)
                | (Status::Failed, Status::Queued)
                // Re-queuing something already queued/processing is a no-op
                // the orphan sweeper relies on being idempotent.
                | (Status::Queued, Status::Queued)
                | (Status::Processing, Status::Processing)
        )
    }
}

/// A precomputed RUSLE map record: one row per [`Fingerprint`] (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, Getters, Setters, Builder)]
#[builder(setter(into))]
#[setters(prefix = "set_", generate_delegates)]
pub struct PrecomputedMap {
    /// The fingerprint identifying this record.
    fingerprint: Fingerprint,
    /// Current lifecycle state.
    #[builder(default = "Status::Queued")]
    status: Status,
    /// Task identifier of the most recent (or in-flight) task, if any.
    #[builder(default)]
    task_id: Option<String>,
    /// When this record was first created.
    created_at: DateTime<Utc>,
    /// When this record was last updated.
    updated_at: DateTime<Utc>,
    /// Storage-relative path to this map's tile pyramid root, once completed.
    #[builder(default)]
    tile_root: Option<String>,
    /// Storage-relative path to this map's exported GeoTIFF, once completed.
    #[builder(default)]
    geotiff_path: Option<String>,
    /// Mean annual erosion rate, t/ha/yr, once completed.
    #[builder(default)]
    mean_erosion_rate: Option<f64>,
    /// Coefficient of variation of the erosion rate, once completed.
    #[builder(default)]
    erosion_cv: Option<f64>,
    /// Rainfall trend slope, mm/year², once completed.
    #[builder(default)]
    rainfall_slope: Option<f64>,
    /// Rainfall coefficient of variation, once completed.
    #[builder(default)]
    rainfall_cv: Option<f64>,
    /// The full statistics bundle (spec §3.2): `rusle_factors`,
    /// `severity_distribution`, and `rainfallStatistics`, once completed.
    #[builder(default)]
    statistics: Option<serde_json::Value>,
    /// Failure message, set on transition into [`Status::Failed`].
    #[builder(default)]
    error_message: Option<String>,
    /// Structured failure discriminant (e.g. `"NoDataAvailable"`), set
    /// alongside `error_message` on transition into [`Status::Failed`]
    /// (spec §3.1/§4.5/§7, scenario 6).
    #[builder(default)]
    error_type: Option<String>,
    /// Number of times this record has been retried after a failure.
    #[builder(default)]
    retry_count: u32,
}

impl PrecomputedMap {
    /// Attempts to move this record to `next`, bumping `updated_at` and
    /// returning an error if the transition is illegal (spec §4.6).
    pub fn transition(&mut self, next: Status) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::conflict(format!(
                "cannot transition precomputed map from {:?} to {:?}",
                self.status, next
            )));
        }
        if matches!(next, Status::Queued) && matches!(self.status, Status::Failed) {
            self.retry_count += 1;
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Forces a `Completed` or `Failed` record back to `Queued` for a
    /// scheduled refresh (spec §6.5 `--force`), bypassing the normal
    /// transition table: a forced refresh is a deliberate admin action, not
    /// a retry after failure, so it is allowed from `Completed` too.
    pub fn force_requeue(&mut self) {
        self.retry_count += 1;
        self.status = Status::Queued;
        self.updated_at = Utc::now();
    }
}
