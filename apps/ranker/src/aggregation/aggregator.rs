use serde::{Deserialize, Serialize};

use crate::models::score::{AggregatedResult, AxisWeights, ScoreRecord, Tier};

/// Tier cut-offs on the global score: `>= high` strongly recommended,
/// `[low, high)` recommended, below `low` rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    pub high: f64,
    pub low: f64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            high: 80.0,
            low: 60.0,
        }
    }
}

impl TierPolicy {
    pub fn classify(&self, score: f64) -> Tier {
        if score >= self.high {
            Tier::StronglyRecommended
        } else if score >= self.low {
            Tier::Recommended
        } else {
            Tier::Rejected
        }
    }
}

/// Combines the three axis records into one unranked result.
///
/// `score_global = Σ weight_i × score_i`; with validated weights (non-negative,
/// summing to 1) and axis scores in [0, 100] the sum stays in [0, 100]. It is
/// clamped anyway so float drift never leaks past the bounds.
pub fn aggregate(
    candidate_id: &str,
    profile: ScoreRecord,
    technical: ScoreRecord,
    soft_skills: ScoreRecord,
    weights: &AxisWeights,
    tiers: &TierPolicy,
) -> AggregatedResult {
    let score_global = (weights.profile * profile.score()
        + weights.technical * technical.score()
        + weights.soft_skills * soft_skills.score())
    .clamp(0.0, 100.0);

    let tier = tiers.classify(score_global);
    let justification = build_justification(
        candidate_id,
        score_global,
        tier,
        [
            (&profile, weights.profile),
            (&technical, weights.technical),
            (&soft_skills, weights.soft_skills),
        ],
    );

    AggregatedResult {
        candidate_id: candidate_id.to_string(),
        score_global,
        profile,
        technical,
        soft_skills,
        tier,
        justification,
        rank: None,
    }
}

fn build_justification(
    candidate_id: &str,
    score_global: f64,
    tier: Tier,
    axes: [(&ScoreRecord, f64); 3],
) -> String {
    let mut lines = vec![
        format!("Candidate: {candidate_id}"),
        format!("Global score: {score_global:.2}/100"),
        format!("Recommendation: {}", tier.as_str()),
        String::new(),
    ];

    for (record, weight) in axes {
        lines.push(format!(
            "{} ({:.2}/100, weight {:.2}): {}",
            record.scorer().label(),
            record.score(),
            weight,
            record.comment()
        ));
        lines.push(format!("  matched: {}", join_or_none(record.matched())));
        lines.push(format!("  missing: {}", join_or_none(record.missing())));
    }

    lines.join("\n")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::{ScorerBackend, ScorerKind};

    fn record(kind: ScorerKind, score: f64) -> ScoreRecord {
        ScoreRecord::new(
            kind,
            ScorerBackend::Rules,
            score,
            vec!["python".to_string()],
            vec![],
            "ok",
        )
    }

    fn run(p: f64, t: f64, s: f64) -> AggregatedResult {
        aggregate(
            "cand-a",
            record(ScorerKind::Profile, p),
            record(ScorerKind::Technical, t),
            record(ScorerKind::SoftSkills, s),
            &AxisWeights::default(),
            &TierPolicy::default(),
        )
    }

    #[test]
    fn test_weighted_sum() {
        let result = run(100.0, 100.0, 70.0);
        assert!((result.score_global - 91.0).abs() < 1e-9);
        assert_eq!(result.tier, Tier::StronglyRecommended);
        assert_eq!(result.rank, None);
    }

    #[test]
    fn test_tier_boundaries() {
        let policy = TierPolicy::default();
        assert_eq!(policy.classify(80.0), Tier::StronglyRecommended);
        assert_eq!(policy.classify(79.99), Tier::Recommended);
        assert_eq!(policy.classify(60.0), Tier::Recommended);
        assert_eq!(policy.classify(59.99), Tier::Rejected);
    }

    #[test]
    fn test_zero_technical_drops_by_its_weight() {
        let full = run(100.0, 100.0, 70.0);
        let no_tech = run(100.0, 0.0, 70.0);
        assert!((full.score_global - no_tech.score_global - 40.0).abs() < 1e-9);
        assert_eq!(no_tech.tier, Tier::Rejected);
    }

    #[test]
    fn test_global_stays_in_bounds() {
        for (p, t, s) in [(0.0, 0.0, 0.0), (100.0, 100.0, 100.0), (33.3, 66.6, 99.9)] {
            let r = run(p, t, s);
            assert!((0.0..=100.0).contains(&r.score_global));
        }
    }

    #[test]
    fn test_justification_is_deterministic() {
        let a = run(80.0, 55.5, 70.0);
        let b = run(80.0, 55.5, 70.0);
        assert_eq!(a.justification, b.justification);
        assert_eq!(a, b);
    }

    #[test]
    fn test_justification_layout() {
        let result = run(100.0, 100.0, 70.0);
        let lines: Vec<&str> = result.justification.lines().collect();
        assert_eq!(lines[0], "Candidate: cand-a");
        assert_eq!(lines[1], "Global score: 91.00/100");
        assert_eq!(lines[2], "Recommendation: STRONGLY_RECOMMENDED");
        assert_eq!(lines[4], "Profile (100.00/100, weight 0.30): ok");
        assert_eq!(lines[5], "  matched: python");
        assert_eq!(lines[6], "  missing: none");
        assert!(lines[7].starts_with("Technical"));
        assert!(lines[10].starts_with("Soft skills"));
    }
}
