use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::config::EngineConfig;
use crate::llm_client::LlmClient;
use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::models::score::{ScoreRecord, ScorerBackend, ScorerKind};
use crate::normalize::normalize_term;
use crate::scoring::prompts::{build_softskill_prompt, softskill_system};
use crate::scoring::{Scorer, SoftSkillScorer};

/// JSON verdict the model is asked to return.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmVerdict {
    pub score: f64,
    #[serde(default)]
    pub detected: Vec<String>,
    #[serde(default)]
    pub comment: String,
}

/// Soft-skill scorer backed by the hosted LLM.
///
/// Any LLM failure (transport, status, malformed JSON) falls back to the
/// rule-based scorer for that candidate, so a run never fails on the model.
/// Candidates without a letter never reach the model.
pub struct LlmSoftSkillScorer {
    llm: LlmClient,
    fallback: SoftSkillScorer,
    categories: Vec<String>,
}

impl LlmSoftSkillScorer {
    pub fn new(llm: LlmClient, config: &EngineConfig) -> Self {
        Self {
            llm,
            fallback: SoftSkillScorer::from_config(config),
            categories: config
                .softskill_categories
                .iter()
                .map(|c| c.name.clone())
                .collect(),
        }
    }

    /// Maps a model verdict onto a record. Unknown category names are dropped,
    /// known ones keep configuration order.
    pub fn record_from_verdict(&self, verdict: LlmVerdict) -> ScoreRecord {
        let reported: Vec<String> = verdict.detected.iter().map(|d| normalize_term(d)).collect();
        let (matched, missing): (Vec<String>, Vec<String>) = self
            .categories
            .iter()
            .cloned()
            .partition(|c| reported.contains(&normalize_term(c)));

        let comment = if verdict.comment.trim().is_empty() {
            "Soft skills (LLM): no justification returned.".to_string()
        } else {
            format!("Soft skills (LLM): {}", verdict.comment.trim())
        };

        ScoreRecord::new(
            ScorerKind::SoftSkills,
            ScorerBackend::Llm,
            verdict.score,
            matched,
            missing,
            comment,
        )
    }
}

#[async_trait]
impl Scorer for LlmSoftSkillScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::SoftSkills
    }

    fn backend(&self) -> ScorerBackend {
        ScorerBackend::Llm
    }

    async fn score(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        let Some(letter) = candidate.motivation_letter.as_deref() else {
            return self.fallback.no_letter_record();
        };

        let prompt =
            build_softskill_prompt(&target.job_title, &self.categories, &target.keywords, letter);
        match self
            .llm
            .call_json::<LlmVerdict>(&prompt, &softskill_system())
            .await
        {
            Ok(verdict) => self.record_from_verdict(verdict),
            Err(e) => {
                warn!(
                    candidate_id = %candidate.candidate_id,
                    error = %e,
                    "LLM soft-skill scoring failed; using rule-based scorer"
                );
                self.fallback.evaluate(candidate, target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{CandidateProfileDraft, TargetProfileDraft};
    use crate::scoring::softskills::MISSING_LETTER;

    fn scorer() -> LlmSoftSkillScorer {
        let llm = LlmClient::new("test-key".to_string(), None).unwrap();
        LlmSoftSkillScorer::new(llm, &EngineConfig::default())
    }

    #[test]
    fn test_verdict_is_clamped_and_filtered() {
        let record = scorer().record_from_verdict(LlmVerdict {
            score: 130.0,
            detected: vec!["Motivation".into(), "Teamwork".into(), "charisma".into()],
            comment: " Strong letter. ".into(),
        });
        assert_eq!(record.score(), 100.0);
        assert_eq!(record.backend(), ScorerBackend::Llm);
        assert_eq!(record.matched(), &["teamwork", "motivation"]);
        assert_eq!(record.missing().len(), 8);
        assert_eq!(record.comment(), "Soft skills (LLM): Strong letter.");
    }

    #[test]
    fn test_verdict_parses_with_defaults() {
        let verdict: LlmVerdict = serde_json::from_str(r#"{"score": 42}"#).unwrap();
        let record = scorer().record_from_verdict(verdict);
        assert_eq!(record.score(), 42.0);
        assert!(record.matched().is_empty());
    }

    #[tokio::test]
    async fn test_no_letter_skips_the_model() {
        let candidate = CandidateProfile::try_from(CandidateProfileDraft {
            candidate_id: "c".into(),
            ..Default::default()
        })
        .unwrap();
        let target = TargetProfile::try_from(TargetProfileDraft::default()).unwrap();
        let record = scorer().score(&candidate, &target).await;
        assert_eq!(record.score(), 70.0);
        assert_eq!(record.missing(), &[MISSING_LETTER]);
        assert_eq!(record.backend(), ScorerBackend::Rules);
    }
}
