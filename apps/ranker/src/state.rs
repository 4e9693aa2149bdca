use std::sync::Arc;

use sqlx::PgPool;

use crate::evaluation::engine::EvaluationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Scorers, configuration and the published corpus. Built once at startup.
    pub engine: Arc<EvaluationEngine>,
}
