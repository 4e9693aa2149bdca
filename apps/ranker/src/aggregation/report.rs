use serde::Serialize;

use crate::models::score::{round2, AggregatedResult, Tier};

const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub candidate_id: String,
    #[serde(serialize_with = "round2")]
    pub score_global: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStatistics {
    pub total_candidates: usize,
    #[serde(serialize_with = "round2")]
    pub mean_score: f64,
    #[serde(serialize_with = "round2")]
    pub max_score: f64,
    #[serde(serialize_with = "round2")]
    pub min_score: f64,
}

/// End-of-run summary: top five, score statistics, readable text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    pub top: Vec<ReportEntry>,
    pub statistics: ReportStatistics,
    pub summary: String,
}

impl RankingReport {
    /// Expects `ranked` in rank order, as returned by `rank_results`.
    pub fn build(ranked: &[AggregatedResult]) -> Self {
        let top: Vec<ReportEntry> = ranked
            .iter()
            .take(TOP_N)
            .enumerate()
            .map(|(i, r)| ReportEntry {
                rank: r.rank.unwrap_or(i + 1),
                candidate_id: r.candidate_id.clone(),
                score_global: r.score_global,
                tier: r.tier,
            })
            .collect();

        let scores: Vec<f64> = ranked.iter().map(|r| r.score_global).collect();
        let statistics = if scores.is_empty() {
            ReportStatistics {
                total_candidates: 0,
                mean_score: 0.0,
                max_score: 0.0,
                min_score: 0.0,
            }
        } else {
            ReportStatistics {
                total_candidates: scores.len(),
                mean_score: scores.iter().sum::<f64>() / scores.len() as f64,
                max_score: scores.iter().copied().fold(f64::MIN, f64::max),
                min_score: scores.iter().copied().fold(f64::MAX, f64::min),
            }
        };

        let summary = build_summary(&top, &statistics);
        Self {
            top,
            statistics,
            summary,
        }
    }
}

fn build_summary(top: &[ReportEntry], stats: &ReportStatistics) -> String {
    if stats.total_candidates == 0 {
        return "Ranking report: no candidates evaluated.".to_string();
    }

    let mut summary = format!(
        "Ranking report: {} candidate(s) evaluated.\n\nTop {}:",
        stats.total_candidates,
        top.len()
    );
    for entry in top {
        summary.push_str(&format!(
            "\n{}. {} - {:.1}/100 ({})",
            entry.rank,
            entry.candidate_id,
            entry.score_global,
            entry.tier.as_str()
        ));
    }
    summary.push_str(&format!(
        "\n\nStatistics:\n- mean: {:.1}/100\n- max: {:.1}/100\n- min: {:.1}/100",
        stats.mean_score, stats.max_score, stats.min_score
    ));
    summary
}
