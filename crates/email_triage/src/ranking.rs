//! Ordering and grouping of actionable records

use std::collections::BTreeMap;

use crate::types::ActionableRecord;

/// Ascending sort key: unanswered first, then time-sensitive, then importance.
pub fn sort_key(record: &ActionableRecord) -> (bool, bool, u8) {
    (
        record.already_responded,
        !record.classification.time_sensitive,
        record.classification.importance.rank(),
    )
}

/// Stable sort by `sort_key`; ties keep input order.
pub fn rank(mut records: Vec<ActionableRecord>) -> Vec<ActionableRecord> {
    records.sort_by_key(sort_key);
    records
}

/// Topic -> records declaring it, in input order.
///
/// A record with several topics appears under each of them.
pub fn group_by_topic(records: &[ActionableRecord]) -> BTreeMap<String, Vec<&ActionableRecord>> {
    let mut groups: BTreeMap<String, Vec<&ActionableRecord>> = BTreeMap::new();

    for record in records {
        let mut seen: Vec<&str> = Vec::new();
        for topic in &record.classification.topics {
            if seen.contains(&topic.as_str()) {
                continue;
            }
            seen.push(topic);
            groups.entry(topic.clone()).or_default().push(record);
        }
    }

    groups
}
