use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregation::aggregator::TierPolicy;
use crate::models::score::AxisWeights;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Service configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub enable_llm_softskills: bool,
    pub scoring_config_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_api_key: optional_env("LLM_API_KEY"),
            llm_model: optional_env("LLM_MODEL"),
            enable_llm_softskills: optional_env("ENABLE_LLM_SOFTSKILLS")
                .map(|v| v.parse::<bool>())
                .transpose()
                .context("ENABLE_LLM_SOFTSKILLS must be 'true' or 'false'")?
                .unwrap_or(false),
            scoring_config_path: optional_env("SCORING_CONFIG_PATH").map(PathBuf::from),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Engine configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read scoring config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse scoring config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("environment variable {key}={value:?} is not a valid value")]
    InvalidEnv { key: &'static str, value: String },

    #[error("{name} must sum to 1.0, got {sum}")]
    WeightSum { name: &'static str, sum: f64 },

    #[error("{key} is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

/// A soft-skill category and the terms that reveal it in a letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftSkillCategory {
    pub name: String,
    pub terms: Vec<String>,
}

impl SoftSkillCategory {
    fn new(name: &str, terms: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }
}

pub fn default_softskill_categories() -> Vec<SoftSkillCategory> {
    vec![
        SoftSkillCategory::new(
            "teamwork",
            &["teamwork", "team", "collaboration", "collaborate", "équipe", "collaborer", "coopération"],
        ),
        SoftSkillCategory::new(
            "communication",
            &["communication", "present", "explain", "communiquer", "présenter", "expliquer", "oral", "écrit"],
        ),
        SoftSkillCategory::new(
            "leadership",
            &["leadership", "lead", "leader", "manage", "mentor", "diriger", "management", "gérer", "encadrer"],
        ),
        SoftSkillCategory::new(
            "autonomy",
            &["autonomous", "independent", "initiative", "autonome", "autonomie", "indépendant", "indépendance"],
        ),
        SoftSkillCategory::new(
            "problem_solving",
            &["solve", "problem", "solution", "challenge", "résoudre", "problème", "défi", "analyser"],
        ),
        SoftSkillCategory::new(
            "adaptability",
            &["adaptable", "adapt", "flexible", "agile", "changement", "évolution"],
        ),
        SoftSkillCategory::new(
            "motivation",
            &["motivated", "motivation", "passion", "passionate", "enthusiastic", "motivé", "intéressé", "enthousiaste", "désireux"],
        ),
        SoftSkillCategory::new(
            "creativity",
            &["creative", "creativity", "innovation", "imagination", "original", "créatif", "créativité"],
        ),
        SoftSkillCategory::new(
            "organization",
            &["organized", "organization", "planning", "organisé", "organisation", "planification", "méthodique", "structuré"],
        ),
        SoftSkillCategory::new(
            "stress_management",
            &["stress", "pressure", "calm", "pression", "sous pression", "calme", "sérénité"],
        ),
    ]
}

/// Scoring and retrieval parameters. Passed to the engine at construction and
/// never read from globals afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weight_profile: f64,
    pub weight_technical: f64,
    pub weight_softskills: f64,
    pub top_k: usize,
    pub tier_threshold_high: f64,
    pub tier_threshold_low: f64,
    pub experience_tolerance_band: f64,
    pub profile_experience_weight: f64,
    pub profile_skill_weight: f64,
    pub profile_optional_skill_bonus: f64,
    pub technical_optional_bonus: f64,
    pub skill_importance: BTreeMap<String, f64>,
    pub softskill_default_score: f64,
    pub letter_base_max: f64,
    pub letter_full_words: usize,
    pub category_bonus: f64,
    pub keyword_bonus_max: f64,
    pub softskill_categories: Vec<SoftSkillCategory>,
    pub embedding_dimension: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight_profile: 0.3,
            weight_technical: 0.4,
            weight_softskills: 0.3,
            top_k: 10,
            tier_threshold_high: 80.0,
            tier_threshold_low: 60.0,
            experience_tolerance_band: 3.0,
            profile_experience_weight: 0.4,
            profile_skill_weight: 0.6,
            profile_optional_skill_bonus: 20.0,
            technical_optional_bonus: 10.0,
            skill_importance: BTreeMap::new(),
            softskill_default_score: 70.0,
            letter_base_max: 40.0,
            letter_full_words: 200,
            category_bonus: 10.0,
            keyword_bonus_max: 20.0,
            softskill_categories: default_softskill_categories(),
            embedding_dimension: 256,
        }
    }
}

impl EngineConfig {
    /// Defaults, then the JSON file at `path` (any subset of keys), then
    /// environment overrides for scalar keys. The result is validated.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env_override(&mut self.weight_profile, "WEIGHT_PROFILE", lookup)?;
        env_override(&mut self.weight_technical, "WEIGHT_TECHNICAL", lookup)?;
        env_override(&mut self.weight_softskills, "WEIGHT_SOFTSKILLS", lookup)?;
        env_override(&mut self.top_k, "TOP_K", lookup)?;
        env_override(&mut self.tier_threshold_high, "TIER_THRESHOLD_HIGH", lookup)?;
        env_override(&mut self.tier_threshold_low, "TIER_THRESHOLD_LOW", lookup)?;
        env_override(&mut self.experience_tolerance_band, "EXPERIENCE_TOLERANCE_BAND", lookup)?;
        env_override(&mut self.profile_experience_weight, "PROFILE_EXPERIENCE_WEIGHT", lookup)?;
        env_override(&mut self.profile_skill_weight, "PROFILE_SKILL_WEIGHT", lookup)?;
        env_override(&mut self.profile_optional_skill_bonus, "PROFILE_OPTIONAL_SKILL_BONUS", lookup)?;
        env_override(&mut self.technical_optional_bonus, "TECHNICAL_OPTIONAL_BONUS", lookup)?;
        env_override(&mut self.softskill_default_score, "SOFTSKILL_DEFAULT_SCORE", lookup)?;
        env_override(&mut self.letter_base_max, "LETTER_BASE_MAX", lookup)?;
        env_override(&mut self.letter_full_words, "LETTER_FULL_WORDS", lookup)?;
        env_override(&mut self.category_bonus, "CATEGORY_BONUS", lookup)?;
        env_override(&mut self.keyword_bonus_max, "KEYWORD_BONUS_MAX", lookup)?;
        env_override(&mut self.embedding_dimension, "EMBEDDING_DIMENSION", lookup)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("weight_profile", self.weight_profile),
            ("weight_technical", self.weight_technical),
            ("weight_softskills", self.weight_softskills),
            ("profile_experience_weight", self.profile_experience_weight),
            ("profile_skill_weight", self.profile_skill_weight),
            ("profile_optional_skill_bonus", self.profile_optional_skill_bonus),
            ("technical_optional_bonus", self.technical_optional_bonus),
            ("letter_base_max", self.letter_base_max),
            ("category_bonus", self.category_bonus),
            ("keyword_bonus_max", self.keyword_bonus_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, format!("must be finite and >= 0, got {value}")));
            }
        }

        let axis_sum = self.weight_profile + self.weight_technical + self.weight_softskills;
        if (axis_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum {
                name: "weight_profile + weight_technical + weight_softskills",
                sum: axis_sum,
            });
        }
        let profile_sum = self.profile_experience_weight + self.profile_skill_weight;
        if (profile_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum {
                name: "profile_experience_weight + profile_skill_weight",
                sum: profile_sum,
            });
        }

        if self.top_k == 0 {
            return Err(invalid("top_k", "must be > 0"));
        }
        for (key, value) in [
            ("tier_threshold_high", self.tier_threshold_high),
            ("tier_threshold_low", self.tier_threshold_low),
            ("softskill_default_score", self.softskill_default_score),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(key, format!("must be within [0, 100], got {value}")));
            }
        }
        if self.tier_threshold_high <= self.tier_threshold_low {
            return Err(invalid(
                "tier_threshold_high",
                format!(
                    "must be greater than tier_threshold_low ({} <= {})",
                    self.tier_threshold_high, self.tier_threshold_low
                ),
            ));
        }
        if !self.experience_tolerance_band.is_finite() || self.experience_tolerance_band <= 0.0 {
            return Err(invalid("experience_tolerance_band", "must be finite and > 0"));
        }
        if self.letter_full_words == 0 {
            return Err(invalid("letter_full_words", "must be > 0"));
        }
        if self.embedding_dimension == 0 {
            return Err(invalid("embedding_dimension", "must be > 0"));
        }
        for (skill, weight) in &self.skill_importance {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(invalid(
                    format!("skill_importance.{skill}"),
                    format!("must be finite and > 0, got {weight}"),
                ));
            }
        }
        for category in &self.softskill_categories {
            if category.name.trim().is_empty() {
                return Err(invalid("softskill_categories", "category name must not be empty"));
            }
            if category.terms.iter().all(|t| t.trim().is_empty()) {
                return Err(invalid(
                    format!("softskill_categories.{}", category.name),
                    "needs at least one trigger term",
                ));
            }
        }
        Ok(())
    }

    pub fn axis_weights(&self) -> AxisWeights {
        AxisWeights {
            profile: self.weight_profile,
            technical: self.weight_technical,
            soft_skills: self.weight_softskills,
        }
    }

    pub fn tier_policy(&self) -> TierPolicy {
        TierPolicy {
            high: self.tier_threshold_high,
            low: self.tier_threshold_low,
        }
    }
}

fn env_override<T, F>(slot: &mut T, key: &'static str, lookup: &F) -> Result<(), ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *slot = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value })?;
    }
    Ok(())
}

fn invalid(key: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::load(None, no_env).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.softskill_categories.len(), 10);
        assert_eq!(config.top_k, 10);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"{"weight_profile": 0.2, "weight_technical": 0.5, "top_k": 3}"#,
        );
        let config = EngineConfig::load(Some(file.path()), no_env).unwrap();
        assert_eq!(config.weight_profile, 0.2);
        assert_eq!(config.weight_technical, 0.5);
        assert_eq!(config.weight_softskills, 0.3);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(r#"{"top_k": 3}"#);
        let env = env_from(&[("TOP_K", "7"), ("SOFTSKILL_DEFAULT_SCORE", "55")]);
        let config = EngineConfig::load(Some(file.path()), env).unwrap();
        assert_eq!(config.top_k, 7);
        assert_eq!(config.softskill_default_score, 55.0);
    }

    #[test]
    fn test_weight_sum_enforced() {
        let env = env_from(&[("WEIGHT_PROFILE", "0.5")]);
        let err = EngineConfig::load(None, env).unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum { .. }));
    }

    #[test]
    fn test_weights_within_tolerance_accepted() {
        let env = env_from(&[
            ("WEIGHT_PROFILE", "0.3333333"),
            ("WEIGHT_TECHNICAL", "0.3333333"),
            ("WEIGHT_SOFTSKILLS", "0.3333334"),
        ]);
        assert!(EngineConfig::load(None, env).is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let env = env_from(&[
            ("WEIGHT_PROFILE", "-0.1"),
            ("WEIGHT_TECHNICAL", "0.8"),
            ("WEIGHT_SOFTSKILLS", "0.3"),
        ]);
        assert!(matches!(
            EngineConfig::load(None, env),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let env = env_from(&[("TIER_THRESHOLD_HIGH", "50")]);
        let err = EngineConfig::load(None, env).unwrap_err();
        assert!(err.to_string().contains("tier_threshold_high"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let env = env_from(&[("TOP_K", "0")]);
        assert!(EngineConfig::load(None, env).is_err());
    }

    #[test]
    fn test_unparseable_env_rejected() {
        let env = env_from(&[("TOP_K", "ten")]);
        assert!(matches!(
            EngineConfig::load(None, env),
            Err(ConfigError::InvalidEnv { key: "TOP_K", .. })
        ));
    }

    #[test]
    fn test_bad_importance_rejected() {
        let file = write_config(r#"{"skill_importance": {"python": 0}}"#);
        assert!(EngineConfig::load(Some(file.path()), no_env).is_err());
    }

    #[test]
    fn test_empty_category_rejected() {
        let file = write_config(r#"{"softskill_categories": [{"name": "grit", "terms": []}]}"#);
        assert!(EngineConfig::load(Some(file.path()), no_env).is_err());
    }

    #[test]
    fn test_missing_file_reported() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/scoring.json")), no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file_reported() {
        let file = write_config("{not json");
        assert!(matches!(
            EngineConfig::load(Some(file.path()), no_env),
            Err(ConfigError::Parse { .. })
        ));
    }
}
