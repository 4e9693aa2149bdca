use serde::{Deserialize, Serialize, Serializer};

/// The three evaluation axes, in justification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Profile,
    Technical,
    SoftSkills,
}

impl ScorerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScorerKind::Profile => "Profile",
            ScorerKind::Technical => "Technical",
            ScorerKind::SoftSkills => "Soft skills",
        }
    }
}

/// Which implementation produced a score. Reported for transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerBackend {
    Rules,
    Llm,
}

/// Serializes an `f64` rounded to two decimals. Values are stored unrounded.
pub fn round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Output of one scorer for one candidate. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    scorer: ScorerKind,
    backend: ScorerBackend,
    #[serde(serialize_with = "round2")]
    score: f64,
    matched: Vec<String>,
    missing: Vec<String>,
    comment: String,
}

impl ScoreRecord {
    /// Builds a record, clamping `score` into [0, 100] (NaN becomes 0).
    pub fn new(
        scorer: ScorerKind,
        backend: ScorerBackend,
        score: f64,
        matched: Vec<String>,
        missing: Vec<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            scorer,
            backend,
            score: clamp_score(score),
            matched,
            missing,
            comment: comment.into(),
        }
    }

    /// Zero score used when a scorer could not run for a candidate.
    pub fn failed(scorer: ScorerKind, reason: impl Into<String>) -> Self {
        Self::new(
            scorer,
            ScorerBackend::Rules,
            0.0,
            Vec::new(),
            Vec::new(),
            reason,
        )
    }

    pub fn scorer(&self) -> ScorerKind {
        self.scorer
    }

    pub fn backend(&self) -> ScorerBackend {
        self.backend
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn matched(&self) -> &[String] {
        &self.matched
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    StronglyRecommended,
    Recommended,
    Rejected,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::StronglyRecommended => "STRONGLY_RECOMMENDED",
            Tier::Recommended => "RECOMMENDED",
            Tier::Rejected => "REJECTED",
        }
    }
}

/// Per-axis weights. Validated by the engine configuration to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisWeights {
    pub profile: f64,
    pub technical: f64,
    pub soft_skills: f64,
}

impl Default for AxisWeights {
    fn default() -> Self {
        Self {
            profile: 0.3,
            technical: 0.4,
            soft_skills: 0.3,
        }
    }
}

impl AxisWeights {
    pub fn sum(&self) -> f64 {
        self.profile + self.technical + self.soft_skills
    }
}

/// Final per-candidate result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub candidate_id: String,
    #[serde(serialize_with = "round2")]
    pub score_global: f64,
    pub profile: ScoreRecord,
    pub technical: ScoreRecord,
    pub soft_skills: ScoreRecord,
    pub tier: Tier,
    pub justification: String,
    /// 1-based, set by `rank_results`.
    pub rank: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_record_clamps() {
        let high = ScoreRecord::new(ScorerKind::Technical, ScorerBackend::Rules, 140.0, vec![], vec![], "");
        assert_eq!(high.score(), 100.0);
        let low = ScoreRecord::new(ScorerKind::Technical, ScorerBackend::Rules, -3.0, vec![], vec![], "");
        assert_eq!(low.score(), 0.0);
        let nan = ScoreRecord::new(ScorerKind::Technical, ScorerBackend::Rules, f64::NAN, vec![], vec![], "");
        assert_eq!(nan.score(), 0.0);
    }

    #[test]
    fn test_score_record_serializes_rounded() {
        let record = ScoreRecord::new(
            ScorerKind::SoftSkills,
            ScorerBackend::Rules,
            66.66666,
            vec!["teamwork".to_string()],
            vec![],
            "ok",
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["score"], 66.67);
        assert_eq!(value["scorer"], "soft_skills");
        assert_eq!(value["backend"], "rules");
        // stored value stays unrounded
        assert!(record.score() < 66.667);
    }

    #[test]
    fn test_tier_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(Tier::StronglyRecommended).unwrap(),
            "STRONGLY_RECOMMENDED"
        );
        assert_eq!(Tier::Rejected.as_str(), "REJECTED");
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((AxisWeights::default().sum() - 1.0).abs() < 1e-9);
    }
}
