//! The Fingerprint & Map Registry (C6): storage abstraction over
//! [`PrecomputedMap`] records, keyed by [`Fingerprint`].

use super::fingerprint::Fingerprint;
use super::model::{PrecomputedMap, PrecomputedMapBuilder, Status};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage abstraction for precomputed-map records.
///
/// The orchestrator (C7) and task runtime (C5) depend on this trait, never
/// on a concrete backend, the way the teacher's services depend on client
/// traits rather than concrete HTTP clients.
#[async_trait]
pub trait MapRegistry: Send + Sync {
    /// Fetches the record for `fingerprint`, if one exists.
    async fn get(&self, fingerprint: &Fingerprint) -> crate::Result<Option<PrecomputedMap>>;

    /// Fetches the record for `fingerprint`, creating a fresh `Queued`
    /// record if none exists. Returns `(record, was_created)`.
    ///
    /// This is the at-most-one-task-per-fingerprint guarantee's storage
    /// half (spec invariant P1): concurrent callers racing on the same
    /// fingerprint must observe the same single record, never two.
    async fn get_or_create(&self, fingerprint: &Fingerprint) -> crate::Result<(PrecomputedMap, bool)>;

    /// Applies `mutate` to the stored record for `fingerprint` and persists
    /// the result, failing if no record exists yet.
    async fn update(
        &self,
        fingerprint: &Fingerprint,
        mutate: Box<dyn FnOnce(&mut PrecomputedMap) -> crate::Result<()> + Send>,
    ) -> crate::Result<PrecomputedMap>;

    /// Lists every record in `Queued` or `Processing` whose `updated_at` is
    /// older than `stuck_after`, for the scheduled orphan sweep (C8).
    async fn list_stuck(&self, stuck_after: chrono::Duration) -> crate::Result<Vec<PrecomputedMap>>;
}

/// An in-process [`MapRegistry`] backed by a `RwLock<HashMap<..>>`.
///
/// The default backend; sufficient for a single-process deployment or for
/// tests. Production multi-worker deployments should use the
/// `postgres`-gated [`super::pg::PgMapRegistry`] instead.
#[derive(Default)]
pub struct InMemoryMapRegistry {
    records: Arc<RwLock<HashMap<Fingerprint, PrecomputedMap>>>,
}

impl InMemoryMapRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MapRegistry for InMemoryMapRegistry {
    #[tracing::instrument(skip(self))]
    async fn get(&self, fingerprint: &Fingerprint) -> crate::Result<Option<PrecomputedMap>> {
        let records = self.records.read().await;
        Ok(records.get(fingerprint).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn get_or_create(&self, fingerprint: &Fingerprint) -> crate::Result<(PrecomputedMap, bool)> {
        // Single write-lock critical section: two concurrent callers never
        // both observe "missing" and both insert, which is what P1 requires.
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(fingerprint) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let record = PrecomputedMapBuilder::default()
            .fingerprint(fingerprint.clone())
            .created_at(now)
            .updated_at(now)
            .build()
            .expect("required builder fields are always supplied");

        records.insert(fingerprint.clone(), record.clone());
        tracing::info!(?fingerprint, "created new precomputed-map record");
        Ok((record, true))
    }

    #[tracing::instrument(skip(self, mutate))]
    async fn update(
        &self,
        fingerprint: &Fingerprint,
        mutate: Box<dyn FnOnce(&mut PrecomputedMap) -> crate::Result<()> + Send>,
    ) -> crate::Result<PrecomputedMap> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(fingerprint)
            .ok_or_else(|| crate::Error::conflict("no record exists for this fingerprint"))?;
        mutate(record)?;
        Ok(record.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn list_stuck(&self, stuck_after: chrono::Duration) -> crate::Result<Vec<PrecomputedMap>> {
        let threshold: DateTime<Utc> = Utc::now() - stuck_after;
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| matches!(r.status(), Status::Queued | Status::Processing) && *r.updated_at() < threshold)
            .cloned()
            .collect())
    }
}
