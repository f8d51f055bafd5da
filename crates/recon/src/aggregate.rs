//! Fold matched attributes into per-bucket summary statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Entity;

/// What to accumulate per bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    /// Number of entities in the bucket.
    Count,
    /// Sum of a numeric attribute. Missing or non-numeric values are
    /// skipped, not errors.
    Sum { attr: String },
    /// Frequency tally of a categorical attribute.
    Tally { attr: String },
    /// Number of entities whose numeric attribute is at least `min`.
    ThresholdCount { attr: String, min: f64 },
}

/// A named metric to accumulate.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
}

/// One tally entry. Tallies are sorted descending by count, ties ascending
/// by label, for reproducible output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub label: String,
    pub count: u64,
}

/// Accumulated summary for one bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketSummary {
    /// Entities grouped into this bucket.
    pub entities: usize,
    pub counts: BTreeMap<String, u64>,
    pub sums: BTreeMap<String, f64>,
    pub tallies: BTreeMap<String, Vec<TallyEntry>>,
}

/// Group entities by `bucket_fn`, accumulating each metric per bucket.
pub fn aggregate<F>(
    entities: &[Entity],
    bucket_fn: F,
    metrics: &[Metric],
) -> BTreeMap<String, BucketSummary>
where
    F: Fn(&Entity) -> String,
{
    let mut raw: BTreeMap<String, (BucketSummary, BTreeMap<String, BTreeMap<String, u64>>)> =
        BTreeMap::new();

    for entity in entities {
        let bucket = bucket_fn(entity);
        let (summary, tally_maps) = raw.entry(bucket).or_default();
        summary.entities += 1;

        for metric in metrics {
            match &metric.kind {
                MetricKind::Count => {
                    *summary.counts.entry(metric.name.clone()).or_insert(0) += 1;
                }
                MetricKind::Sum { attr } => {
                    if let Some(v) = entity.attr_f64(attr) {
                        *summary.sums.entry(metric.name.clone()).or_insert(0.0) += v;
                    }
                }
                MetricKind::Tally { attr } => {
                    let label = entity.attr_str(attr);
                    if !label.is_empty() {
                        *tally_maps
                            .entry(metric.name.clone())
                            .or_default()
                            .entry(label.to_string())
                            .or_insert(0) += 1;
                    }
                }
                MetricKind::ThresholdCount { attr, min } => {
                    let meets = entity.attr_f64(attr).map(|v| v >= *min).unwrap_or(false);
                    if meets {
                        *summary.counts.entry(metric.name.clone()).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    raw.into_iter()
        .map(|(bucket, (mut summary, tally_maps))| {
            for (name, counts) in tally_maps {
                summary.tallies.insert(name, sort_tally(counts));
            }
            (bucket, summary)
        })
        .collect()
}

/// Share of a total. `0.0` (not an error) when the denominator is zero,
/// because most of these datasets are inherently incomplete.
pub fn share(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Bucket function grouping by a string attribute; entities without the
/// attribute land in the empty bucket.
pub fn bucket_by_attr(attr: &str) -> impl Fn(&Entity) -> String + '_ {
    move |entity: &Entity| entity.attr_str(attr).to_string()
}

fn sort_tally(counts: BTreeMap<String, u64>) -> Vec<TallyEntry> {
    let mut entries: Vec<TallyEntry> = counts
        .into_iter()
        .map(|(label, count)| TallyEntry { label, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries
}
