//! Postgres persistence for candidates and index versions.
//!
//! Both tables are append-only: a new candidate version or a new index version
//! is always an INSERT, never an UPDATE.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use crate::models::index::{CandidateRow, IndexEntryRow, IndexVersionRow};
use crate::models::profile::CandidateProfile;
use crate::retrieval::embedding::Embedding;
use crate::retrieval::index::{IndexEntry, IndexHandle};

/// Appends a new version of `profile` and returns its version number.
///
/// Registrations of the same candidate are serialized on a transaction-scoped
/// advisory lock, so concurrent calls get consecutive versions.
pub async fn insert_candidate(pool: &PgPool, profile: &CandidateProfile) -> Result<i32> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&profile.candidate_id)
        .execute(&mut *tx)
        .await?;

    let new_version: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO candidates (candidate_id, version, profile)
        SELECT $1, COALESCE(MAX(version), 0) + 1, $2
        FROM candidates
        WHERE candidate_id = $1
        RETURNING version
        "#,
    )
    .bind(&profile.candidate_id)
    .bind(Json(profile))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        candidate_id = %profile.candidate_id,
        version = new_version,
        "Inserted candidate version"
    );
    Ok(new_version)
}

/// Returns the most recent version of every candidate, ordered by id.
pub async fn get_current_candidates(pool: &PgPool) -> Result<Vec<CandidateProfile>> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT DISTINCT ON (candidate_id) *
        FROM candidates
        ORDER BY candidate_id, version DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to load current candidates")?;

    Ok(rows.into_iter().map(|r| r.profile.0).collect())
}

pub async fn next_index_version(pool: &PgPool) -> Result<u64> {
    let current_max: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM index_versions")
        .fetch_one(pool)
        .await?;
    Ok(current_max.map(|v| v as u64).unwrap_or(0) + 1)
}

/// Writes one index version together with the profiles it was built from,
/// so a version can be loaded back without consulting `candidates`.
pub async fn persist_snapshot(
    pool: &PgPool,
    handle: &IndexHandle,
    embedder_name: &str,
    profiles: &[CandidateProfile],
) -> Result<()> {
    let version = i64::try_from(handle.version()).context("index version overflows BIGINT")?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO index_versions (version, built_at, dimension, embedder, entry_count)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(version)
    .bind(handle.built_at())
    .bind(handle.dimension() as i32)
    .bind(embedder_name)
    .bind(handle.len() as i32)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("failed to insert index version {version}"))?;

    for (entry, profile) in pair_with_profiles(handle.entries(), profiles)? {
        sqlx::query(
            r#"
            INSERT INTO index_entries (version, candidate_id, embedding, metadata, profile)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(version)
        .bind(&entry.candidate_id)
        .bind(entry.embedding.as_slice())
        .bind(Json(&entry.metadata))
        .bind(Json(profile))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(
        index_version = version,
        entries = handle.len(),
        "Persisted index snapshot"
    );
    Ok(())
}

/// Matches every index entry with the profile it was embedded from.
fn pair_with_profiles<'a>(
    entries: &'a [IndexEntry],
    profiles: &'a [CandidateProfile],
) -> Result<Vec<(&'a IndexEntry, &'a CandidateProfile)>> {
    let by_id: HashMap<&str, &CandidateProfile> = profiles
        .iter()
        .map(|p| (p.candidate_id.as_str(), p))
        .collect();

    entries
        .iter()
        .map(|entry| {
            by_id
                .get(entry.candidate_id.as_str())
                .map(|profile| (entry, *profile))
                .with_context(|| format!("no profile for indexed candidate '{}'", entry.candidate_id))
        })
        .collect()
}

/// Loads the newest persisted index version with its candidate profiles.
pub async fn load_latest_snapshot(
    pool: &PgPool,
) -> Result<Option<(IndexHandle, Vec<CandidateProfile>)>> {
    let header: Option<IndexVersionRow> =
        sqlx::query_as("SELECT * FROM index_versions ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, IndexEntryRow>(
        "SELECT * FROM index_entries WHERE version = $1 ORDER BY candidate_id",
    )
    .bind(header.version)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    let mut profiles = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(IndexEntry {
            candidate_id: row.candidate_id,
            embedding: Embedding(row.embedding),
            metadata: row.metadata.0,
        });
        profiles.push(row.profile.0);
    }

    let handle = IndexHandle::build_at(header.version as u64, header.built_at, entries)
        .with_context(|| format!("persisted index version {} is inconsistent", header.version))?;

    Ok(Some((handle, profiles)))
}

/// Lists every persisted index version, oldest first.
pub async fn list_index_versions(pool: &PgPool) -> Result<Vec<IndexVersionRow>> {
    Ok(
        sqlx::query_as::<_, IndexVersionRow>("SELECT * FROM index_versions ORDER BY version ASC")
            .fetch_all(pool)
            .await?,
    )
}
