//! Scoring Engine: three independent scorers behind one pluggable trait.
//!
//! Default backends are rule-based (fast, deterministic, no external call).
//! `LlmSoftSkillScorer` can replace the soft-skill axis at startup.
//!
//! The engine holds each axis as an `Arc<dyn Scorer>`, so a backend swap never
//! touches aggregation or the handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::models::score::{ScoreRecord, ScorerBackend, ScorerKind};

pub mod llm;
pub mod profile;
pub mod prompts;
pub mod softskills;
pub mod technical;

pub use llm::LlmSoftSkillScorer;
pub use profile::ProfileScorer;
pub use softskills::SoftSkillScorer;
pub use technical::TechnicalScorer;

/// One evaluation axis. Implement this to add a backend.
///
/// Scoring is infallible: configuration is captured at construction, and
/// missing candidate data maps to documented defaults recorded in the
/// returned `ScoreRecord`.
#[async_trait]
pub trait Scorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    fn backend(&self) -> ScorerBackend;

    async fn score(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord;
}

/// The three scorers a run uses, one per axis.
#[derive(Clone)]
pub struct ScorerSet {
    pub profile: Arc<dyn Scorer>,
    pub technical: Arc<dyn Scorer>,
    pub soft_skills: Arc<dyn Scorer>,
}

impl ScorerSet {
    /// Rule-based scorers for all three axes.
    pub fn rules(config: &EngineConfig) -> Self {
        Self {
            profile: Arc::new(ProfileScorer::from_config(config)),
            technical: Arc::new(TechnicalScorer::from_config(config)),
            soft_skills: Arc::new(SoftSkillScorer::from_config(config)),
        }
    }

    pub fn with_soft_skills(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.soft_skills = scorer;
        self
    }
}

/// Formats up to `limit` names as a comma-separated list, noting the overflow.
pub(crate) fn list_preview(items: &[String], limit: usize) -> String {
    if items.len() <= limit {
        items.join(", ")
    } else {
        format!(
            "{} (+{} more)",
            items[..limit].join(", "),
            items.len() - limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_preview() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(list_preview(&items, 5), "a, b, c");
        assert_eq!(list_preview(&items, 2), "a, b (+1 more)");
        assert_eq!(list_preview(&[], 2), "");
    }

    #[test]
    fn test_rules_set_covers_each_axis() {
        let set = ScorerSet::rules(&EngineConfig::default());
        assert_eq!(set.profile.kind(), ScorerKind::Profile);
        assert_eq!(set.technical.kind(), ScorerKind::Technical);
        assert_eq!(set.soft_skills.kind(), ScorerKind::SoftSkills);
        assert_eq!(set.soft_skills.backend(), ScorerBackend::Rules);
    }
}
