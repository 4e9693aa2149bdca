//! Axum route handlers for the Evaluation API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{AppError, AppJson};
use crate::evaluation::corpus::IndexInfo;
use crate::evaluation::engine::{EvaluationRequest, EvaluationResponse, QueryResponse};
use crate::extraction::{extract_candidate, extract_posting, PostingOverrides};
use crate::models::index::IndexVersionRow;
use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::retrieval::store::{
    get_current_candidates, insert_candidate, list_index_versions, next_index_version,
    persist_snapshot,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractPostingRequest {
    pub posting_text: String,
    #[serde(default)]
    pub overrides: PostingOverrides,
}

#[derive(Debug, Deserialize)]
pub struct ExtractCandidateRequest {
    pub candidate_id: String,
    pub cv_text: String,
    pub motivation_letter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterCandidateResponse {
    pub candidate_id: String,
    pub version: i32,
}

#[derive(Debug, Deserialize)]
pub struct QueryIndexRequest {
    pub target: TargetProfile,
    pub top_k: Option<usize>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/evaluations
///
/// Scores and ranks a shortlist (inline, by id, or retrieved) against a posting.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    AppJson(request): AppJson<EvaluationRequest>,
) -> Result<Json<EvaluationResponse>, AppError> {
    let response = state.engine.evaluate(request).await?;
    Ok(Json(response))
}

/// POST /api/v1/postings/extract
pub async fn handle_extract_posting(
    AppJson(request): AppJson<ExtractPostingRequest>,
) -> Result<Json<TargetProfile>, AppError> {
    if request.posting_text.trim().is_empty() {
        return Err(AppError::Validation(
            "posting_text cannot be empty".to_string(),
        ));
    }
    let target = extract_posting(&request.posting_text, request.overrides)?;
    Ok(Json(target))
}

/// POST /api/v1/candidates/extract
pub async fn handle_extract_candidate(
    AppJson(request): AppJson<ExtractCandidateRequest>,
) -> Result<Json<CandidateProfile>, AppError> {
    if request.cv_text.trim().is_empty() {
        return Err(AppError::Validation("cv_text cannot be empty".to_string()));
    }
    let profile = extract_candidate(
        &request.candidate_id,
        &request.cv_text,
        request.motivation_letter,
    )?;
    Ok(Json(profile))
}

/// POST /api/v1/candidates
///
/// Appends a new version of the candidate. The index is not touched until the
/// next rebuild.
pub async fn handle_register_candidate(
    State(state): State<AppState>,
    AppJson(profile): AppJson<CandidateProfile>,
) -> Result<(StatusCode, Json<RegisterCandidateResponse>), AppError> {
    let version = insert_candidate(&state.db, &profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterCandidateResponse {
            candidate_id: profile.candidate_id,
            version,
        }),
    ))
}

/// GET /api/v1/index
pub async fn handle_index_info(State(state): State<AppState>) -> Json<IndexInfo> {
    Json(state.engine.index_info())
}

/// GET /api/v1/index/versions
pub async fn handle_index_versions(
    State(state): State<AppState>,
) -> Result<Json<Vec<IndexVersionRow>>, AppError> {
    let versions = list_index_versions(&state.db).await?;
    Ok(Json(versions))
}

/// POST /api/v1/index/rebuild
///
/// Builds a new index version from the current candidate registry, persists
/// it, then publishes it. Runs already in flight keep their old snapshot.
pub async fn handle_rebuild_index(
    State(state): State<AppState>,
) -> Result<Json<IndexInfo>, AppError> {
    let engine = &state.engine;
    let _rebuild = engine.lock_rebuild().await;

    let profiles = get_current_candidates(&state.db).await?;
    let version_floor = next_index_version(&state.db).await?;

    let snapshot = engine.rebuild_snapshot(version_floor, profiles.clone())?;
    persist_snapshot(&state.db, &snapshot.index, engine.embedder().name(), &profiles).await?;

    let info = snapshot.info();
    engine.publish(snapshot);
    info!(
        index_version = info.version,
        entries = info.entry_count,
        "Index rebuilt"
    );
    Ok(Json(info))
}

/// POST /api/v1/index/query
pub async fn handle_query_index(
    State(state): State<AppState>,
    AppJson(request): AppJson<QueryIndexRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let response = state.engine.query(&request.target, request.top_k)?;
    Ok(Json(response))
}
