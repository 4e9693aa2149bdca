//! Published corpus: an index version plus the candidate profiles it was built from.
//!
//! Readers clone the current `Arc<CorpusSnapshot>` and drop the lock at once,
//! so a query always runs against one immutable snapshot. Publishing swaps the
//! `Arc`; snapshots already handed out stay valid.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::models::profile::CandidateProfile;
use crate::retrieval::embedding::Embedder;
use crate::retrieval::index::{IndexEntry, IndexError, IndexHandle};
use crate::retrieval::store::{
    get_current_candidates, load_latest_snapshot, next_index_version, persist_snapshot,
};

pub struct CorpusSnapshot {
    pub index: IndexHandle,
    profiles: BTreeMap<String, Arc<CandidateProfile>>,
}

impl CorpusSnapshot {
    /// Embeds `profiles` and builds index `version` over them.
    pub fn build(
        version: u64,
        profiles: Vec<CandidateProfile>,
        embedder: &dyn Embedder,
    ) -> Result<Self, IndexError> {
        let entries = profiles
            .iter()
            .map(|p| IndexEntry::from_profile(p, embedder))
            .collect();
        let index = IndexHandle::build(version, entries)?;
        Ok(Self::from_parts(index, profiles))
    }

    /// Pairs an already-built index with its profiles (used when loading from Postgres).
    pub fn from_parts(index: IndexHandle, profiles: Vec<CandidateProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|p| (p.candidate_id.clone(), Arc::new(p)))
            .collect();
        Self { index, profiles }
    }

    /// Re-embeds `profiles` into the version after this one (at least
    /// `version_floor`). `self` stays valid for readers still holding it.
    pub fn rebuild(
        &self,
        version_floor: u64,
        profiles: Vec<CandidateProfile>,
        embedder: &dyn Embedder,
    ) -> Result<Self, IndexError> {
        let entries = profiles
            .iter()
            .map(|p| IndexEntry::from_profile(p, embedder))
            .collect();
        let index = self.index.rebuild(version_floor, entries)?;
        Ok(Self::from_parts(index, profiles))
    }

    pub fn empty() -> Self {
        Self {
            index: IndexHandle::empty(0),
            profiles: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.index.version()
    }

    pub fn profile(&self, candidate_id: &str) -> Option<Arc<CandidateProfile>> {
        self.profiles.get(candidate_id).cloned()
    }

    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            version: self.index.version(),
            built_at: self.index.built_at(),
            dimension: self.index.dimension(),
            entry_count: self.index.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub version: u64,
    pub built_at: DateTime<Utc>,
    pub dimension: usize,
    pub entry_count: usize,
}

pub struct CorpusRegistry {
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl CorpusRegistry {
    pub fn new(initial: CorpusSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn current(&self) -> Arc<CorpusSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // A writer only swaps an Arc, so a poisoned lock still holds a whole snapshot.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publishes `snapshot` if it is newer than the current one. Returns
    /// `false` (and keeps the current snapshot) otherwise.
    pub fn publish(&self, snapshot: CorpusSnapshot) -> bool {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if snapshot.version() <= guard.version() {
            warn!(
                current = guard.version(),
                offered = snapshot.version(),
                "refusing to publish an index version that is not newer"
            );
            return false;
        }
        info!(
            index_version = snapshot.version(),
            entries = snapshot.index.len(),
            "published index version"
        );
        *guard = Arc::new(snapshot);
        true
    }

    /// True when `version` is still the published one.
    pub fn is_latest(&self, version: u64) -> bool {
        self.current().version() == version
    }
}

/// Startup corpus: the latest persisted index version if there is one.
///
/// With no persisted version but registered candidates, version 1 is built and
/// persisted. A persisted version whose dimension no longer matches `embedder`
/// is re-embedded into the next version.
pub async fn load_or_bootstrap(pool: &PgPool, embedder: &dyn Embedder) -> Result<CorpusSnapshot> {
    if let Some((index, profiles)) = load_latest_snapshot(pool).await? {
        if index.is_empty() || index.dimension() == embedder.dimension() {
            info!(
                index_version = index.version(),
                entries = index.len(),
                "Loaded persisted index"
            );
            return Ok(CorpusSnapshot::from_parts(index, profiles));
        }
        warn!(
            index_version = index.version(),
            persisted = index.dimension(),
            configured = embedder.dimension(),
            "Embedding dimension changed; re-embedding persisted candidates"
        );
        let version = next_index_version(pool).await?;
        return build_and_persist(pool, embedder, version, profiles).await;
    }

    let profiles = get_current_candidates(pool).await?;
    if profiles.is_empty() {
        info!("No candidates registered; starting with an empty index");
        return Ok(CorpusSnapshot::empty());
    }
    build_and_persist(pool, embedder, 1, profiles).await
}

async fn build_and_persist(
    pool: &PgPool,
    embedder: &dyn Embedder,
    version: u64,
    profiles: Vec<CandidateProfile>,
) -> Result<CorpusSnapshot> {
    let snapshot = CorpusSnapshot::build(version, profiles.clone(), embedder)
        .with_context(|| format!("failed to build index version {version}"))?;
    persist_snapshot(pool, &snapshot.index, embedder.name(), &profiles).await?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::CandidateProfileDraft;
    use crate::retrieval::embedding::HashingEmbedder;

    fn profile(id: &str) -> CandidateProfile {
        CandidateProfile::try_from(CandidateProfileDraft {
            candidate_id: id.to_string(),
            skills: vec!["python".to_string()],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_snapshot_build_and_lookup() {
        let snapshot =
            CorpusSnapshot::build(1, vec![profile("b"), profile("a")], &HashingEmbedder::new(32))
                .unwrap();
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.profile("a").is_some());
        assert!(snapshot.profile("zzz").is_none());
        assert_eq!(snapshot.info().entry_count, 2);
        assert_eq!(snapshot.info().dimension, 32);
    }

    #[test]
    fn test_snapshot_rejects_duplicates() {
        let err = CorpusSnapshot::build(1, vec![profile("a"), profile("a")], &HashingEmbedder::new(8))
            .err()
            .unwrap();
        assert_eq!(err, IndexError::DuplicateEntry("a".to_string()));
    }

    #[test]
    fn test_registry_publishes_newer_versions_only() {
        let embedder = HashingEmbedder::new(16);
        let registry = CorpusRegistry::new(CorpusSnapshot::empty());
        assert_eq!(registry.current().version(), 0);

        let v2 = CorpusSnapshot::build(2, vec![profile("a")], &embedder).unwrap();
        assert!(registry.publish(v2));

        let v1 = CorpusSnapshot::build(1, vec![profile("x")], &embedder).unwrap();
        assert!(!registry.publish(v1));
        let same = CorpusSnapshot::build(2, vec![profile("y")], &embedder).unwrap();
        assert!(!registry.publish(same));

        assert_eq!(registry.current().version(), 2);
        assert!(registry.current().profile("a").is_some());
    }

    #[test]
    fn test_old_snapshot_stays_usable_after_publish() {
        let embedder = HashingEmbedder::new(16);
        let registry = CorpusRegistry::new(
            CorpusSnapshot::build(1, vec![profile("a")], &embedder).unwrap(),
        );
        let held = registry.current();

        registry.publish(CorpusSnapshot::build(2, vec![profile("a"), profile("b")], &embedder).unwrap());

        assert!(!registry.is_latest(held.version()));
        assert!(registry.is_latest(2));
        assert_eq!(held.index.len(), 1);
        let query = embedder.embed_candidate(&profile("a"));
        assert_eq!(held.index.query(query.as_slice(), 5).len(), 1);
    }

    #[test]
    fn test_snapshot_rebuild_bumps_version() {
        let embedder = HashingEmbedder::new(16);
        let v1 = CorpusSnapshot::build(1, vec![profile("a")], &embedder).unwrap();

        let v2 = v1.rebuild(0, vec![profile("a"), profile("b")], &embedder).unwrap();
        assert_eq!(v2.version(), 2);
        assert!(v2.profile("b").is_some());
        assert_eq!(v1.version(), 1);
        assert!(v1.profile("b").is_none());

        let v5 = v2.rebuild(5, vec![profile("c")], &embedder).unwrap();
        assert_eq!(v5.version(), 5);
        assert_eq!(v5.info().entry_count, 1);
    }
}
