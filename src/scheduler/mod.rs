//! Scheduled Refresh Driver (C8): periodic re-precomputation of the latest
//! year's maps and recovery of orphaned (stuck) tasks.

mod orphans;
mod refresh;

pub use orphans::sweep_orphans;
pub use refresh::{refresh_latest_year, AreaCatalog, RefreshOutcome, RefreshSummary};
