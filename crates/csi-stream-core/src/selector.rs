//! Pure selection functions over buffered records.
//!
//! Every extractor composes the same way: topic filter first, then a window
//! over the most recent points.

use crate::types::CsiRecord;

/// Keep records published on `topic`; `None` keeps everything.
///
/// Matching is exact and case-sensitive.
pub fn filter_by_topic<'a, I>(records: I, topic: Option<&str>) -> Vec<&'a CsiRecord>
where
    I: IntoIterator<Item = &'a CsiRecord>,
{
    match topic {
        None => records.into_iter().collect(),
        Some(topic) => records.into_iter().filter(|r| r.has_topic(topic)).collect(),
    }
}

/// The final `n` elements in original order (all of them if fewer exist).
#[must_use]
pub fn last_n<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Topic-filter then window to the most recent `n` records.
pub fn feature_window<'a, I>(records: I, topic: Option<&str>, n: usize) -> Vec<&'a CsiRecord>
where
    I: IntoIterator<Item = &'a CsiRecord>,
{
    let filtered = filter_by_topic(records, topic);
    last_n(&filtered, n).to_vec()
}

/// Distinct topics in first-seen order.
pub fn topics<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a CsiRecord>,
{
    let mut seen: Vec<String> = Vec::new();
    for topic in records.into_iter().filter_map(|r| r.topic.as_deref()) {
        if !seen.iter().any(|t| t == topic) {
            seen.push(topic.to_string());
        }
    }
    seen
}

/// Case-insensitive substring search on topic; an empty term keeps all.
///
/// Records without a topic never match a non-empty term.
pub fn search_topic<'a, I>(records: I, term: &str) -> Vec<&'a CsiRecord>
where
    I: IntoIterator<Item = &'a CsiRecord>,
{
    if term.is_empty() {
        return records.into_iter().collect();
    }
    let needle = term.to_lowercase();
    records
        .into_iter()
        .filter(|r| {
            r.topic
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle))
        })
        .collect()
}
