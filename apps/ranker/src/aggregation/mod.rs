// Aggregator: weighted sum, tiers, justification, ranking, report.
// Pure functions only; nothing here awaits or allocates shared state.

pub mod aggregator;
pub mod ranking;
pub mod report;
