use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::MatchResult;

/// Per-step accounting for a pipeline run. The source scripts always print
/// their misses; unmatched names are first-class output here, not log noise.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: String,
    pub left: String,
    pub right: String,
    pub matched: usize,
    pub unmatched_left: usize,
    pub unmatched_right: usize,
    pub ambiguous: usize,
    pub tier_counts: BTreeMap<String, usize>,
    pub unmatched_left_names: Vec<String>,
    pub unmatched_right_names: Vec<String>,
}

/// Compute a step report from a match result.
pub fn step_report(step: &str, left: &str, right: &str, result: &MatchResult) -> StepReport {
    let mut tier_counts: BTreeMap<String, usize> = BTreeMap::new();
    for pair in &result.matched {
        *tier_counts.entry(pair.tier.to_string()).or_insert(0) += 1;
    }

    StepReport {
        step: step.to_string(),
        left: left.to_string(),
        right: right.to_string(),
        matched: result.matched.len(),
        unmatched_left: result.unmatched_left.len(),
        unmatched_right: result.unmatched_right.len(),
        ambiguous: result.warnings.len(),
        tier_counts,
        unmatched_left_names: result
            .unmatched_left
            .iter()
            .map(|e| e.display_name.clone())
            .collect(),
        unmatched_right_names: result
            .unmatched_right
            .iter()
            .map(|e| e.display_name.clone())
            .collect(),
    }
}
