mod aggregation;
mod config;
mod db;
mod errors;
mod evaluation;
mod extraction;
mod llm_client;
mod models;
mod normalize;
mod retrieval;
mod routes;
mod scoring;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EngineConfig};
use crate::db::create_pool;
use crate::evaluation::corpus::load_or_bootstrap;
use crate::evaluation::engine::EvaluationEngine;
use crate::llm_client::LlmClient;
use crate::retrieval::embedding::{Embedder, HashingEmbedder};
use crate::routes::build_router;
use crate::scoring::{LlmSoftSkillScorer, ScorerSet};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ranker v{}", env!("CARGO_PKG_VERSION"));

    // Scoring configuration: defaults, then SCORING_CONFIG_PATH, then env
    let engine_config = EngineConfig::load(config.scoring_config_path.as_deref(), |key| {
        std::env::var(key).ok()
    })
    .context("invalid scoring configuration")?;
    info!(
        weights = ?engine_config.axis_weights(),
        top_k = engine_config.top_k,
        "Scoring configuration loaded"
    );

    // Initialize PostgreSQL (migrations run here)
    let db = create_pool(&config.database_url).await?;

    let embedder: Arc<dyn Embedder> =
        Arc::new(HashingEmbedder::new(engine_config.embedding_dimension));
    let corpus = load_or_bootstrap(&db, embedder.as_ref()).await?;

    let scorers = build_scorers(&config, &engine_config)?;
    let engine = EvaluationEngine::new(engine_config, scorers, embedder, corpus);
    info!(index_version = engine.corpus().version(), "Evaluation engine ready");

    let state = AppState {
        db,
        engine: Arc::new(engine),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Rule-based scorers, with the LLM soft-skill scorer swapped in when enabled.
fn build_scorers(config: &Config, engine_config: &EngineConfig) -> Result<ScorerSet> {
    let scorers = ScorerSet::rules(engine_config);
    if !config.enable_llm_softskills {
        return Ok(scorers);
    }

    match &config.llm_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone(), config.llm_model.clone())
                .context("failed to initialize LLM client")?;
            info!("LLM soft-skill scorer enabled (model: {})", llm.model());
            Ok(scorers.with_soft_skills(Arc::new(LlmSoftSkillScorer::new(llm, engine_config))))
        }
        None => {
            warn!("ENABLE_LLM_SOFTSKILLS is set but LLM_API_KEY is missing; using rule-based soft skills");
            Ok(scorers)
        }
    }
}
