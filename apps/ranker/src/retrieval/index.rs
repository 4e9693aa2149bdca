//! Immutable, versioned nearest-neighbour index over candidate embeddings.
//!
//! A handle never changes after `build`. `rebuild` produces a new handle with
//! the next version number and leaves the old one usable, so a query that
//! started on version N finishes on version N even if N+1 is published meanwhile.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::profile::CandidateProfile;
use crate::retrieval::embedding::{Embedder, Embedding};
use crate::retrieval::similarity::cosine_similarity;

/// Skills copied into entry metadata.
const METADATA_SKILLS: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("duplicate candidate id '{0}' in index build")]
    DuplicateEntry(String),

    #[error("embedding for '{candidate_id}' has dimension {found}, expected {expected}")]
    DimensionMismatch {
        candidate_id: String,
        expected: usize,
        found: usize,
    },
}

/// Lightweight candidate summary stored next to each embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub name: String,
    pub years_experience: Option<f64>,
    pub skills: Vec<String>,
}

impl EntryMetadata {
    pub fn from_profile(profile: &CandidateProfile) -> Self {
        Self {
            name: profile.name.clone(),
            years_experience: profile.years_experience,
            skills: profile.skills.iter().take(METADATA_SKILLS).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub candidate_id: String,
    pub embedding: Embedding,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn from_profile(profile: &CandidateProfile, embedder: &dyn Embedder) -> Self {
        Self {
            candidate_id: profile.candidate_id.clone(),
            embedding: embedder.embed_candidate(profile),
            metadata: EntryMetadata::from_profile(profile),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexHit {
    pub candidate_id: String,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct IndexHandle {
    version: u64,
    built_at: DateTime<Utc>,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl IndexHandle {
    /// Builds a handle from `entries`, sorted by candidate id.
    ///
    /// The dimension is taken from the first entry; an empty build has dimension 0
    /// and answers every query with no hits.
    pub fn build(version: u64, entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        Self::build_at(version, Utc::now(), entries)
    }

    /// Same as [`IndexHandle::build`] with an explicit build time, used when a
    /// persisted version is loaded back.
    pub fn build_at(
        version: u64,
        built_at: DateTime<Utc>,
        mut entries: Vec<IndexEntry>,
    ) -> Result<Self, IndexError> {
        let dimension = entries.first().map(|e| e.embedding.dimension()).unwrap_or(0);

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.candidate_id.as_str()) {
                return Err(IndexError::DuplicateEntry(entry.candidate_id.clone()));
            }
            if entry.embedding.dimension() != dimension {
                return Err(IndexError::DimensionMismatch {
                    candidate_id: entry.candidate_id.clone(),
                    expected: dimension,
                    found: entry.embedding.dimension(),
                });
            }
        }

        entries.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));

        Ok(Self {
            version,
            built_at,
            dimension,
            entries,
        })
    }

    /// Handle with no entries, built at the Unix epoch.
    pub fn empty(version: u64) -> Self {
        Self {
            version,
            built_at: DateTime::<Utc>::default(),
            dimension: 0,
            entries: Vec::new(),
        }
    }

    /// Builds the next version from `entries`: one past `self`, or `floor` when
    /// that is higher. `self` is left untouched.
    pub fn rebuild(&self, floor: u64, entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        Self::build((self.version + 1).max(floor), entries)
    }

    /// Returns at most `k` hits, most similar first, ties by candidate id.
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<IndexHit> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        if vector.len() != self.dimension {
            warn!(
                index_version = self.version,
                expected = self.dimension,
                found = vector.len(),
                "query vector dimension mismatch; returning no hits"
            );
            return Vec::new();
        }

        let mut hits: Vec<IndexHit> = self
            .entries
            .iter()
            .map(|e| IndexHit {
                candidate_id: e.candidate_id.clone(),
                similarity: cosine_similarity(vector, e.embedding.as_slice()),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        hits.truncate(k);
        hits
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::CandidateProfileDraft;
    use crate::retrieval::embedding::HashingEmbedder;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            candidate_id: id.to_string(),
            embedding: Embedding(vector),
            metadata: EntryMetadata {
                name: id.to_uppercase(),
                years_experience: None,
                skills: vec![],
            },
        }
    }

    #[test]
    fn test_build_sorts_entries() {
        let handle =
            IndexHandle::build(1, vec![entry("b", vec![1.0, 0.0]), entry("a", vec![0.0, 1.0])])
                .unwrap();
        let ids: Vec<_> = handle.entries().iter().map(|e| e.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(handle.dimension(), 2);
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let err = IndexHandle::build(1, vec![entry("a", vec![1.0]), entry("a", vec![0.5])])
            .unwrap_err();
        assert_eq!(err, IndexError::DuplicateEntry("a".to_string()));
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let err = IndexHandle::build(1, vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0])])
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_query_orders_by_similarity_then_id() {
        let handle = IndexHandle::build(
            1,
            vec![
                entry("c", vec![1.0, 0.0]),
                entry("a", vec![1.0, 0.0]),
                entry("b", vec![0.0, 1.0]),
                entry("d", vec![-1.0, 0.0]),
            ],
        )
        .unwrap();

        let hits = handle.query(&[1.0, 0.0], 3);
        let ids: Vec<_> = hits.iter().map(|h| h.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert!(hits.iter().all(|h| (-1.0..=1.0).contains(&h.similarity)));
    }

    #[test]
    fn test_query_edge_cases() {
        let empty = IndexHandle::build(1, vec![]).unwrap();
        assert!(empty.query(&[1.0], 5).is_empty());

        let handle = IndexHandle::build(1, vec![entry("a", vec![1.0, 0.0])]).unwrap();
        assert!(handle.query(&[1.0, 0.0], 0).is_empty());
        assert!(handle.query(&[1.0, 0.0, 0.0], 5).is_empty());
        assert_eq!(handle.query(&[1.0, 0.0], 10).len(), 1);
    }

    #[test]
    fn test_rebuild_leaves_old_handle_intact() {
        let v1 = IndexHandle::build(1, vec![entry("a", vec![1.0, 0.0])]).unwrap();
        let v2 = v1
            .rebuild(0, vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])])
            .unwrap();

        assert_eq!(v1.version(), 1);
        assert_eq!(v1.len(), 1);
        assert_eq!(v2.version(), 2);
        assert_eq!(v2.len(), 2);
        assert_eq!(v1.query(&[0.0, 1.0], 5).len(), 1);
    }

    #[test]
    fn test_rebuild_respects_version_floor() {
        let v1 = IndexHandle::build(1, vec![entry("a", vec![1.0])]).unwrap();
        let next = v1.rebuild(7, vec![entry("a", vec![1.0])]).unwrap();
        assert_eq!(next.version(), 7);

        let v9 = IndexHandle::build(9, vec![]).unwrap();
        assert_eq!(v9.rebuild(3, vec![]).unwrap().version(), 10);
    }

    #[test]
    fn test_candidate_retrieves_itself_first() {
        let embedder = HashingEmbedder::default();
        let profiles: Vec<CandidateProfile> = [
            ("a", vec!["python", "sql"]),
            ("b", vec!["java", "spring"]),
            ("c", vec!["excel", "sap"]),
        ]
        .into_iter()
        .map(|(id, skills)| {
            CandidateProfile::try_from(CandidateProfileDraft {
                candidate_id: id.to_string(),
                skills: skills.into_iter().map(String::from).collect(),
                ..Default::default()
            })
            .unwrap()
        })
        .collect();

        let entries = profiles
            .iter()
            .map(|p| IndexEntry::from_profile(p, &embedder))
            .collect();
        let handle = IndexHandle::build(1, entries).unwrap();

        for profile in &profiles {
            let query = embedder.embed_candidate(profile);
            let hits = handle.query(query.as_slice(), 1);
            assert_eq!(hits[0].candidate_id, profile.candidate_id);
            assert!((hits[0].similarity - 1.0).abs() < 1e-5);
        }
    }
}
