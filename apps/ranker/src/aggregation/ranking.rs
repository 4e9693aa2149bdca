use crate::models::score::AggregatedResult;

/// Sorts by unrounded global score, highest first, ties by candidate id, and
/// assigns 1-based ranks.
pub fn rank_results(mut results: Vec<AggregatedResult>) -> Vec<AggregatedResult> {
    results.sort_by(|a, b| {
        b.score_global
            .total_cmp(&a.score_global)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = Some(i + 1);
    }
    results
}
