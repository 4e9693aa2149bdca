use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::models::profile::{CandidateProfile, SkillSet, TargetProfile};
use crate::models::score::{ScoreRecord, ScorerBackend, ScorerKind};
use crate::normalize::normalize_term;
use crate::scoring::{list_preview, Scorer};

pub const NO_REQUIRED_SKILLS: &str = "no required skills specified";

/// Importance-weighted coverage of the posting's required skills, exact match
/// on folded names only.
#[derive(Debug, Clone)]
pub struct TechnicalScorer {
    /// Configured importance weights, keyed by folded skill name.
    importance: BTreeMap<String, f64>,
    optional_bonus: f64,
}

impl TechnicalScorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            importance: config
                .skill_importance
                .iter()
                .map(|(skill, weight)| (normalize_term(skill), *weight))
                .collect(),
            optional_bonus: config.technical_optional_bonus,
        }
    }

    /// Posting-level weight first, then the configured one, else 1.0.
    fn weight(&self, skill: &str, target: &TargetProfile) -> f64 {
        target
            .skill_importance
            .get(skill)
            .or_else(|| self.importance.get(skill))
            .copied()
            .unwrap_or(1.0)
    }

    /// Returns (Σ w(matched), Σ w(all), matched names).
    fn coverage<'a>(
        &self,
        skills: &'a SkillSet,
        candidate: &CandidateProfile,
        target: &TargetProfile,
    ) -> (f64, f64, Vec<&'a String>) {
        let mut hit_weight = 0.0;
        let mut total_weight = 0.0;
        let mut hits = Vec::new();
        for skill in skills.iter() {
            let w = self.weight(skill, target);
            total_weight += w;
            if candidate.skills.contains(skill) {
                hit_weight += w;
                hits.push(skill);
            }
        }
        (hit_weight, total_weight, hits)
    }

    pub fn evaluate(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        if target.required_skills.is_empty() {
            return ScoreRecord::new(
                ScorerKind::Technical,
                ScorerBackend::Rules,
                100.0,
                Vec::new(),
                Vec::new(),
                format!("Technical: {NO_REQUIRED_SKILLS}; neutral score applied."),
            );
        }

        let (req_hit, req_total, req_hits) =
            self.coverage(&target.required_skills, candidate, target);
        let (opt_hit, opt_total, opt_hits) =
            self.coverage(&target.optional_skills, candidate, target);

        let mut score = 100.0 * req_hit / req_total;
        if opt_total > 0.0 {
            score += self.optional_bonus * opt_hit / opt_total;
        }

        let mut matched: Vec<String> = req_hits.iter().map(|s| s.to_string()).collect();
        matched.extend(opt_hits.iter().map(|s| format!("{s} (optional)")));
        let missing: Vec<String> = target
            .required_skills
            .iter()
            .filter(|s| !candidate.skills.contains(s))
            .cloned()
            .collect();

        let mut comment = format!(
            "Technical: {}/{} required skills matched ({:.0}% of importance weight)",
            req_hits.len(),
            target.required_skills.len(),
            100.0 * req_hit / req_total
        );
        if !opt_hits.is_empty() {
            comment.push_str(&format!(
                ", {}/{} optional",
                opt_hits.len(),
                target.optional_skills.len()
            ));
        }
        if !missing.is_empty() {
            comment.push_str(&format!("; missing: {}", list_preview(&missing, 5)));
        }
        comment.push('.');

        ScoreRecord::new(
            ScorerKind::Technical,
            ScorerBackend::Rules,
            score.min(100.0),
            matched,
            missing,
            comment,
        )
    }
}

#[async_trait]
impl Scorer for TechnicalScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Technical
    }

    fn backend(&self) -> ScorerBackend {
        ScorerBackend::Rules
    }

    async fn score(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        self.evaluate(candidate, target)
    }
}
