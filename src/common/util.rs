//! Small helpers shared by the wrappers

use chrono::{DateTime, Utc};

/// Convert a timestamp to epoch milliseconds
pub fn to_epoch_ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Convert epoch milliseconds to a timestamp
pub fn from_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Join values with `", "`
pub fn join_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split items into `bins` chunks
///
/// Every chunk but the last holds `round(len / bins)` items; the last one
/// takes whatever remains. Chunks may be empty when `bins > len`.
pub fn split_into_bins<T: Clone>(items: &[T], bins: usize) -> Vec<Vec<T>> {
    if bins <= 1 {
        return vec![items.to_vec()];
    }

    // floor(len / bins + 0.5)
    let size = (2 * items.len() + bins) / (2 * bins);
    let mut chunks = Vec::with_capacity(bins);
    for i in 0..bins - 1 {
        let start = (i * size).min(items.len());
        let end = (start + size).min(items.len());
        chunks.push(items[start..end].to_vec());
    }
    let last = ((bins - 1) * size).min(items.len());
    chunks.push(items[last..].to_vec());
    chunks
}
