use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::profile::CandidateProfile;
use crate::retrieval::index::EntryMetadata;

/// One appended version of a candidate profile.
#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub candidate_id: String,
    pub version: i32,
    pub profile: Json<CandidateProfile>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IndexVersionRow {
    pub version: i64,
    pub built_at: DateTime<Utc>,
    pub dimension: i32,
    pub embedder: String,
    pub entry_count: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct IndexEntryRow {
    pub version: i64,
    pub candidate_id: String,
    pub embedding: Vec<f32>,
    pub metadata: Json<EntryMetadata>,
    pub profile: Json<CandidateProfile>,
}
