//! Orchestrator / Service API (C7): the façade combining the config
//! resolver, fingerprint & map registry, and background task runtime into
//! the handful of operations a caller (HTTP layer, CLI, scheduler) needs.

mod api;
mod responses;

pub use api::{AdministrativeBoundaryLookup, Orchestrator, DEFAULT_ZOOM_RANGE};
pub use responses::{MapStatusResponse, RuntimeStatusResponse};
