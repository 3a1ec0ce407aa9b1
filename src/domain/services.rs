//! Domain services for ranking and summarizing aggregated records

use std::collections::HashMap;

use super::entities::{CategorySummary, DetectionRecord};
use super::value_objects::Category;

/// Sort records by severity rank (critical first), then by detection time
/// descending. This is the canonical presentation order for every read path.
pub fn rank_records(records: &mut [DetectionRecord]) {
    records.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.detected_at.cmp(&a.detected_at))
    });
}

/// Compute per-category summaries from an already-loaded record list. Working
/// in memory keeps the summary path to a single storage round-trip.
pub fn summarize_by_category(records: &[DetectionRecord]) -> HashMap<Category, CategorySummary> {
    let mut summaries: HashMap<Category, CategorySummary> = HashMap::new();
    for record in records {
        summaries
            .entry(record.category.clone())
            .or_default()
            .record(record);
    }
    summaries
}
