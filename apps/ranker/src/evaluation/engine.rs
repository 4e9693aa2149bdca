//! Evaluation run: Select → Score(×3 per candidate) → Aggregate → Rank.
//!
//! The engine owns no mutable state of its own. The corpus lives in a
//! `CorpusRegistry`; configuration and scorers are fixed at construction.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregation::aggregator::aggregate;
use crate::aggregation::ranking::rank_results;
use crate::aggregation::report::RankingReport;
use crate::config::EngineConfig;
use crate::evaluation::corpus::{CorpusRegistry, CorpusSnapshot, IndexInfo};
use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::models::score::{AggregatedResult, ScoreRecord, ScorerKind};
use crate::retrieval::embedding::Embedder;
use crate::retrieval::index::{IndexError, IndexHit};
use crate::scoring::ScorerSet;

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("candidate '{0}' appears more than once in the shortlist")]
    DuplicateCandidate(String),

    #[error("top_k must be greater than 0")]
    InvalidTopK,
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Where the candidates of a run come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CandidateSelection {
    /// Profiles sent with the request; the corpus is not consulted.
    Inline { profiles: Vec<CandidateProfile> },
    /// Corpus members by id. Unknown ids are reported, not fatal.
    Ids { ids: Vec<String> },
    /// Top-K of the current index for the posting.
    Retrieval { top_k: Option<usize> },
}

impl Default for CandidateSelection {
    fn default() -> Self {
        Self::Retrieval { top_k: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRequest {
    pub target: TargetProfile,
    #[serde(default)]
    pub candidates: CandidateSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Ranked,
    NoCandidatesFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResponse {
    pub run_id: Uuid,
    pub status: EvaluationStatus,
    /// Index version the shortlist was taken from; `None` for inline runs.
    pub index_version: Option<u64>,
    pub results: Vec<AggregatedResult>,
    pub unknown_candidates: Vec<String>,
    pub report: RankingReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub index_version: u64,
    pub hits: Vec<IndexHit>,
}

struct Shortlist {
    index_version: Option<u64>,
    candidates: Vec<Arc<CandidateProfile>>,
    unknown: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct EvaluationEngine {
    config: Arc<EngineConfig>,
    scorers: ScorerSet,
    embedder: Arc<dyn Embedder>,
    registry: CorpusRegistry,
    rebuild_lock: Mutex<()>,
}

impl EvaluationEngine {
    pub fn new(
        config: EngineConfig,
        scorers: ScorerSet,
        embedder: Arc<dyn Embedder>,
        initial: CorpusSnapshot,
    ) -> Self {
        Self {
            config: Arc::new(config),
            scorers,
            embedder,
            registry: CorpusRegistry::new(initial),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn corpus(&self) -> Arc<CorpusSnapshot> {
        self.registry.current()
    }

    pub fn index_info(&self) -> IndexInfo {
        self.registry.current().info()
    }

    /// Rebuilds the current snapshot over `profiles`, numbered at least
    /// `version_floor`. Nothing is published.
    pub fn rebuild_snapshot(
        &self,
        version_floor: u64,
        profiles: Vec<CandidateProfile>,
    ) -> Result<CorpusSnapshot, IndexError> {
        self.registry
            .current()
            .rebuild(version_floor, profiles, self.embedder.as_ref())
    }

    pub fn publish(&self, snapshot: CorpusSnapshot) -> bool {
        self.registry.publish(snapshot)
    }

    /// Held for the whole read-build-persist-publish sequence of a rebuild,
    /// so two rebuilds never compete for the same version number.
    pub async fn lock_rebuild(&self) -> MutexGuard<'_, ()> {
        self.rebuild_lock.lock().await
    }

    /// Nearest candidates of the current index for `target`.
    pub fn query(
        &self,
        target: &TargetProfile,
        top_k: Option<usize>,
    ) -> Result<QueryResponse, EvaluationError> {
        let k = self.resolve_top_k(top_k)?;
        let snapshot = self.registry.current();
        let vector = self.embedder.embed_target(target);
        Ok(QueryResponse {
            index_version: snapshot.version(),
            hits: snapshot.index.query(vector.as_slice(), k),
        })
    }

    pub async fn evaluate(
        &self,
        request: EvaluationRequest,
    ) -> Result<EvaluationResponse, EvaluationError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let target = Arc::new(request.target);

        let shortlist = self.select(&target, request.candidates)?;
        if !shortlist.unknown.is_empty() {
            warn!(
                %run_id,
                unknown = shortlist.unknown.len(),
                "some requested candidates are not in the corpus"
            );
        }

        if shortlist.candidates.is_empty() {
            info!(%run_id, index_version = ?shortlist.index_version, "no candidates to evaluate");
            return Ok(EvaluationResponse {
                run_id,
                status: EvaluationStatus::NoCandidatesFound,
                index_version: shortlist.index_version,
                results: Vec::new(),
                unknown_candidates: shortlist.unknown,
                report: RankingReport::build(&[]),
            });
        }

        let results = self.score_shortlist(run_id, target, shortlist.candidates).await;
        let ranked = rank_results(results);
        let report = RankingReport::build(&ranked);

        if let Some(version) = shortlist.index_version {
            if !self.registry.is_latest(version) {
                info!(%run_id, index_version = version, "a newer index was published during the run");
            }
        }
        info!(
            %run_id,
            index_version = ?shortlist.index_version,
            candidates = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "evaluation run complete"
        );

        Ok(EvaluationResponse {
            run_id,
            status: EvaluationStatus::Ranked,
            index_version: shortlist.index_version,
            results: ranked,
            unknown_candidates: shortlist.unknown,
            report,
        })
    }

    fn resolve_top_k(&self, top_k: Option<usize>) -> Result<usize, EvaluationError> {
        match top_k.unwrap_or(self.config.top_k) {
            0 => Err(EvaluationError::InvalidTopK),
            k => Ok(k),
        }
    }

    fn select(
        &self,
        target: &TargetProfile,
        selection: CandidateSelection,
    ) -> Result<Shortlist, EvaluationError> {
        match selection {
            CandidateSelection::Inline { profiles } => {
                let mut seen = HashSet::with_capacity(profiles.len());
                for profile in &profiles {
                    if !seen.insert(profile.candidate_id.as_str()) {
                        return Err(EvaluationError::DuplicateCandidate(
                            profile.candidate_id.clone(),
                        ));
                    }
                }
                Ok(Shortlist {
                    index_version: None,
                    candidates: profiles.into_iter().map(Arc::new).collect(),
                    unknown: Vec::new(),
                })
            }
            CandidateSelection::Ids { ids } => {
                let snapshot = self.registry.current();
                let mut seen = HashSet::with_capacity(ids.len());
                let mut candidates = Vec::new();
                let mut unknown = Vec::new();
                for id in ids {
                    if !seen.insert(id.clone()) {
                        continue;
                    }
                    match snapshot.profile(&id) {
                        Some(profile) => candidates.push(profile),
                        None => unknown.push(id),
                    }
                }
                Ok(Shortlist {
                    index_version: Some(snapshot.version()),
                    candidates,
                    unknown,
                })
            }
            CandidateSelection::Retrieval { top_k } => {
                let k = self.resolve_top_k(top_k)?;
                let snapshot = self.registry.current();
                let vector = self.embedder.embed_target(target);
                let hits = snapshot.index.query(vector.as_slice(), k);
                info!(
                    index_version = snapshot.version(),
                    hits = hits.len(),
                    "retrieved shortlist"
                );
                Ok(Shortlist {
                    index_version: Some(snapshot.version()),
                    candidates: hits
                        .iter()
                        .filter_map(|hit| snapshot.profile(&hit.candidate_id))
                        .collect(),
                    unknown: Vec::new(),
                })
            }
        }
    }

    /// One task per candidate; the three scorers run concurrently inside it.
    async fn score_shortlist(
        &self,
        run_id: Uuid,
        target: Arc<TargetProfile>,
        candidates: Vec<Arc<CandidateProfile>>,
    ) -> Vec<AggregatedResult> {
        let weights = self.config.axis_weights();
        let tiers = self.config.tier_policy();

        let tasks: Vec<_> = candidates
            .into_iter()
            .map(|candidate| {
                let scorers = self.scorers.clone();
                let target = Arc::clone(&target);
                let candidate_id = candidate.candidate_id.clone();
                let task = tokio::spawn(async move {
                    tokio::join!(
                        scorers.profile.score(&candidate, &target),
                        scorers.technical.score(&candidate, &target),
                        scorers.soft_skills.score(&candidate, &target),
                    )
                });
                (candidate_id, task)
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (candidate_id, task) in tasks {
            let (profile, technical, soft_skills) = match task.await {
                Ok(records) => records,
                Err(e) => {
                    error!(%run_id, candidate_id = %candidate_id, error = %e, "scoring task failed");
                    let reason = format!("scoring failed for this candidate: {e}");
                    (
                        ScoreRecord::failed(ScorerKind::Profile, reason.clone()),
                        ScoreRecord::failed(ScorerKind::Technical, reason.clone()),
                        ScoreRecord::failed(ScorerKind::SoftSkills, reason),
                    )
                }
            };
            results.push(aggregate(
                &candidate_id,
                profile,
                technical,
                soft_skills,
                &weights,
                &tiers,
            ));
        }
        results
    }
}
