use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::models::profile::{CandidateProfile, ExperienceRange, TargetProfile};
use crate::models::score::{ScoreRecord, ScorerBackend, ScorerKind};
use crate::scoring::Scorer;

pub const MISSING_EXPERIENCE: &str = "experience not provided (treated as 0 years)";

/// Experience fit plus required/optional skill overlap.
///
/// ```text
/// experience_credit = 1                               inside [min, max]
///                   = max(0, 1 - deviation / band)    outside
/// skill_subfactor   = min(100, 100 * req_hit / |req| + bonus * opt_hit / |opt|)
/// score             = w_exp * experience_credit * 100 + w_skill * skill_subfactor
/// ```
#[derive(Debug, Clone)]
pub struct ProfileScorer {
    experience_weight: f64,
    skill_weight: f64,
    tolerance_band: f64,
    optional_bonus: f64,
}

impl ProfileScorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            experience_weight: config.profile_experience_weight,
            skill_weight: config.profile_skill_weight,
            tolerance_band: config.experience_tolerance_band,
            optional_bonus: config.profile_optional_skill_bonus,
        }
    }

    fn experience_credit(&self, range: &ExperienceRange, years: f64) -> f64 {
        let deviation = range.deviation(years);
        if deviation <= 0.0 {
            1.0
        } else {
            (1.0 - deviation / self.tolerance_band).max(0.0)
        }
    }

    pub fn evaluate(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        let mut matched = Vec::new();
        let mut missing = Vec::new();
        let mut notes = Vec::new();

        // ── experience ──
        let years = match candidate.years_experience {
            Some(years) => years,
            None => {
                missing.push(MISSING_EXPERIENCE.to_string());
                0.0
            }
        };
        let credit = self.experience_credit(&target.experience, years);
        let wanted = format_range(&target.experience);
        let experience_factor = format!("experience {years:.1} years (wanted {wanted})");
        if credit >= 1.0 {
            matched.push(experience_factor);
        } else if candidate.years_experience.is_some() {
            missing.push(experience_factor);
        }
        notes.push(format!("experience credit {:.0}%", credit * 100.0));

        // ── skills ──
        let required = &target.required_skills;
        let required_hits: Vec<&String> = required
            .iter()
            .filter(|s| candidate.skills.contains(s))
            .collect();
        let required_part = if required.is_empty() {
            notes.push("no required skills specified".to_string());
            100.0
        } else {
            notes.push(format!(
                "{}/{} required skills",
                required_hits.len(),
                required.len()
            ));
            100.0 * required_hits.len() as f64 / required.len() as f64
        };

        let optional = &target.optional_skills;
        let optional_hits: Vec<&String> = optional
            .iter()
            .filter(|s| candidate.skills.contains(s))
            .collect();
        let optional_part = if optional.is_empty() {
            0.0
        } else {
            notes.push(format!(
                "{}/{} optional skills",
                optional_hits.len(),
                optional.len()
            ));
            self.optional_bonus * optional_hits.len() as f64 / optional.len() as f64
        };
        let skill_subfactor = (required_part + optional_part).min(100.0);

        matched.extend(required_hits.iter().map(|s| s.to_string()));
        matched.extend(optional_hits.iter().map(|s| format!("{s} (optional)")));
        missing.extend(
            required
                .iter()
                .filter(|s| !candidate.skills.contains(s))
                .cloned(),
        );

        let score = self.experience_weight * credit * 100.0 + self.skill_weight * skill_subfactor;

        ScoreRecord::new(
            ScorerKind::Profile,
            ScorerBackend::Rules,
            score,
            matched,
            missing,
            format!("Profile fit: {}.", notes.join("; ")),
        )
    }
}

fn format_range(range: &ExperienceRange) -> String {
    match range.max {
        Some(max) => format!("{}-{}", range.min, max),
        None => format!("{}+", range.min),
    }
}

#[async_trait]
impl Scorer for ProfileScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Profile
    }

    fn backend(&self) -> ScorerBackend {
        ScorerBackend::Rules
    }

    async fn score(&self, candidate: &CandidateProfile, target: &TargetProfile) -> ScoreRecord {
        self.evaluate(candidate, target)
    }
}
