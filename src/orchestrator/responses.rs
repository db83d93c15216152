//! Response DTOs for the Orchestrator / Service API (C7), with the field
//! aliases spec §4 names explicitly (`erosionCV`/`rainfallCV` are not
//! plain camelCase of their Rust names).

use crate::registry::{Fingerprint, PrecomputedMap, Status};
use serde::Serialize;

/// The status and, once available, results of a precomputed map (spec
/// §4.7/§6.2/§6.3): `{status, tiles_url?, statistics?, components?,
/// task_id?, period_label, geometry_hash, max_zoom}`, plus the flat
/// erosion/rainfall summary fields the front-end reads directly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStatusResponse {
    /// Current lifecycle status.
    pub status: Status,
    /// Task id of the most recent (or in-flight) computation, if any.
    pub task_id: Option<String>,
    /// Mean annual erosion rate, t/ha/yr.
    #[serde(rename = "meanErosionRate")]
    pub mean_erosion_rate: Option<f64>,
    /// Coefficient of variation of the erosion rate.
    #[serde(rename = "erosionCV")]
    pub erosion_cv: Option<f64>,
    /// Rainfall trend slope, mm/year².
    #[serde(rename = "rainfallSlope")]
    pub rainfall_slope: Option<f64>,
    /// Rainfall coefficient of variation.
    #[serde(rename = "rainfallCV")]
    pub rainfall_cv: Option<f64>,
    /// Relative path to the tile pyramid root, once completed.
    pub tile_root: Option<String>,
    /// Templated tile URL (`{z}/{x}/{y}` placeholders), present only once
    /// the map has completed.
    pub tiles_url: Option<String>,
    /// The full statistics bundle (spec §3.2): `rusle_factors`,
    /// `severity_distribution`, and `rainfallStatistics`, once completed.
    /// Absent for records that predate this field or never reached
    /// `completed`.
    pub statistics: Option<serde_json::Value>,
    /// The `rusle_factors` per-factor breakdown alone, populated only for
    /// records that retained it (spec §4.7).
    pub components: Option<serde_json::Value>,
    /// The period this record covers, e.g. `"2020"`.
    pub period_label: String,
    /// The geometry hash folded into this record's fingerprint (empty for
    /// canonical administrative areas).
    pub geometry_hash: String,
    /// Maximum zoom level this map's tile pyramid was generated to.
    pub max_zoom: u32,
    /// Failure message, if the last attempt failed.
    pub error_message: Option<String>,
    /// Structured failure discriminant, if the last attempt failed.
    pub error_type: Option<String>,
    /// Number of retries so far.
    pub retry_count: u32,
}

impl MapStatusResponse {
    /// Builds a response from a stored record, its fingerprint, and the
    /// zoom range it was (or will be) rendered at.
    pub fn build(record: &PrecomputedMap, fingerprint: &Fingerprint, zoom_range: (u32, u32)) -> Self {
        let tiles_url = matches!(record.status(), Status::Completed).then(|| {
            format!(
                "/api/erosion/tiles/{}/{}/{}/{{z}}/{{x}}/{{y}}.png",
                fingerprint.area_type().as_str(),
                fingerprint.area_id(),
                fingerprint.period_label(),
            )
        });
        let components = record.statistics().as_ref().and_then(|v| v.get("rusle_factors")).cloned();

        Self {
            status: *record.status(),
            task_id: record.task_id().clone(),
            mean_erosion_rate: *record.mean_erosion_rate(),
            erosion_cv: *record.erosion_cv(),
            rainfall_slope: *record.rainfall_slope(),
            rainfall_cv: *record.rainfall_cv(),
            tile_root: record.tile_root().clone(),
            tiles_url,
            statistics: record.statistics().clone(),
            components,
            period_label: fingerprint.period_label(),
            geometry_hash: fingerprint.geometry_hash().clone(),
            max_zoom: zoom_range.1,
            error_message: record.error_message().clone(),
            error_type: record.error_type().clone(),
            retry_count: *record.retry_count(),
        }
    }
}

/// A point-in-time snapshot of the background task runtime (spec §6.4 status probe).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatusResponse {
    /// Number of tasks currently queued.
    pub queue_depth: usize,
    /// Number of worker loops running.
    pub worker_count: usize,
}
