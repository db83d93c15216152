//! Centralized environment configuration and the RUSLE Configuration Resolver (C9).
//!
//! This module provides a single point of access for all environment
//! variables used by the core (loaded once and cached, the way the
//! teacher's `EnvConfig` does), and the deep-merge/hash machinery that
//! turns an admin's override dictionary into a deterministic, filtered,
//! hashed effective configuration.

mod defaults;
mod overrides;

pub use defaults::{
    CFactorDefaults, ComplexityDefaults, KFactorDefaults, LsFactorDefaults, PFactorDefaults,
    RFactorDefaults, RusleDefaults, DEFAULTS_VERSION,
};
pub use overrides::{deep_merge, effective_config, filter_overrides, hash_overrides, Overrides};

use secrecy::SecretString;
use std::sync::OnceLock;

/// Global environment configuration singleton.
static ENV_CONFIG: OnceLock<EnvConfig> = OnceLock::new();

/// Environment configuration for the RUSLE core.
///
/// Loaded once on first access via [`EnvConfig::global()`] and cached for
/// the lifetime of the process. Secrets are wrapped in [`SecretString`] to
/// prevent accidental logging or exposure.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Path to the raster-compute service account JSON key file.
    pub raster_service_account_key_path: Option<String>,

    /// Raster-compute service project id.
    pub raster_service_project_id: Option<SecretString>,

    /// Filesystem root under which GeoTIFFs and tile pyramids are written.
    pub storage_root: String,

    /// Number of background task-runtime workers (spec §5, default 4).
    pub task_runtime_workers: usize,

    /// Number of threads in the per-task batched sampling pool (default 8).
    pub sample_pool_workers: usize,

    /// Batch size for batched point sampling (default 50).
    pub sample_batch_size: usize,

    /// Wall-clock guard for any single remote operation, in seconds (default 600).
    pub computation_timeout_secs: u64,

    /// Age (seconds) after which a queued/processing record is considered
    /// an orphan candidate (default 300).
    pub orphan_stuck_after_secs: u64,
}

impl EnvConfig {
    fn load() -> Self {
        let _ = dotenvy::dotenv();

        tracing::debug!("loading environment configuration");

        let config = Self {
            raster_service_account_key_path: std::env::var("RUSLE_RASTER_SERVICE_ACCOUNT_KEY")
                .ok(),
            raster_service_project_id: std::env::var("RUSLE_RASTER_PROJECT_ID")
                .ok()
                .map(|s| SecretString::new(s.into())),
            storage_root: std::env::var("RUSLE_STORAGE_ROOT")
                .unwrap_or_else(|_| "./storage".to_string()),
            task_runtime_workers: env_usize("RUSLE_TASK_WORKERS", 4),
            sample_pool_workers: env_usize("RUSLE_SAMPLE_POOL_WORKERS", 8),
            sample_batch_size: env_usize("RUSLE_SAMPLE_BATCH_SIZE", 50),
            computation_timeout_secs: env_u64("RUSLE_COMPUTATION_TIMEOUT_SECS", 600),
            orphan_stuck_after_secs: env_u64("RUSLE_ORPHAN_STUCK_AFTER_SECS", 300),
        };

        tracing::debug!("environment configuration loaded");
        config
    }

    /// Gets the global environment configuration, loading it on first access.
    pub fn global() -> &'static Self {
        ENV_CONFIG.get_or_init(Self::load)
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
