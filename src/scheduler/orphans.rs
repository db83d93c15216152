//! Orphan sweep (spec §4.8/§6.5): finds `Queued`/`Processing` records that
//! have sat untouched past
//! [`crate::config::EnvConfig::orphan_stuck_after_secs`] *and* whose task id
//! the broker no longer recognizes (a worker crashed mid-task, or never
//! picked the task up), and requeues them so the broker tries again.
//!
//! Age alone is not enough: a task that is merely slow but still actively
//! held by the broker must never be force-requeued, or a second worker
//! would start computing the same fingerprint while the first is still
//! running, violating the at-most-one-task-per-fingerprint guarantee (P1).

use crate::registry::{MapRegistry, Status};
use crate::task::TaskBroker;
use chrono::Duration;

/// One orphaned record and the outcome of requeuing it.
#[derive(Debug, Clone)]
pub struct OrphanOutcome {
    /// The area id the orphaned record belongs to.
    pub area_id: String,
    /// Set if requeuing this record failed.
    pub error: Option<String>,
}

/// Scans `registry` for stuck records older than `stuck_after` whose task
/// id `broker` no longer recognizes, and transitions each back to `Queued`,
/// incrementing its retry count.
///
/// Queued records are bounced through the normal `Failed -> Queued`-shaped
/// path is not applicable here -- a stuck `Queued` record never started, so
/// it is simply re-marked `Queued` (a no-op transition); a stuck
/// `Processing` record is forced back since no worker is still holding it.
#[tracing::instrument(skip(registry, broker))]
pub async fn sweep_orphans(
    registry: &dyn MapRegistry,
    broker: &dyn TaskBroker,
    stuck_after: Duration,
) -> crate::Result<Vec<OrphanOutcome>> {
    let stuck = registry.list_stuck(stuck_after).await?;
    let mut outcomes = Vec::with_capacity(stuck.len());

    for record in stuck {
        let fingerprint = record.fingerprint().clone();
        let area_id = fingerprint.area_id().clone();

        let known_to_broker = match record.task_id() {
            Some(task_id) => broker.is_known(task_id).await,
            None => false,
        };
        if known_to_broker {
            tracing::debug!(area_id, "stuck record's task is still known to the broker, skipping");
            continue;
        }

        let was_processing = matches!(record.status(), Status::Processing);

        let result = registry
            .update(
                &fingerprint,
                Box::new(move |record| {
                    if was_processing {
                        record.force_requeue();
                    }
                    Ok(())
                }),
            )
            .await;

        match result {
            Ok(_) => {
                tracing::warn!(area_id, "requeued orphaned task");
                outcomes.push(OrphanOutcome { area_id, error: None });
            }
            Err(error) => {
                tracing::error!(area_id, %error, "failed to requeue orphaned task");
                outcomes.push(OrphanOutcome {
                    area_id,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    Ok(outcomes)
}
