// File: src/learning.rs
use crate::error::{Error, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Longest context bucket, in chars. Keeps keys bounded for scripts written
/// without spaces.
const BUCKET_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionKey {
    pub bucket: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCount {
    pub key: SelectionKey,
    pub count: u64,
}

/// Counts which suggestion the user picked after which context. The counts
/// only break ties between equally scored model suggestions.
///
/// Counters are sharded, so recording never blocks predictions reading a
/// different shard; a read may miss a concurrent increment.
pub struct SelectionLearner {
    counts: DashMap<SelectionKey, u64>,
    /// Sum of the counts recorded under each bucket.
    bucket_totals: DashMap<String, u64>,
    frequency_increment: u64,
}

impl SelectionLearner {
    pub fn new() -> Self {
        Self { counts: DashMap::new(), bucket_totals: DashMap::new(), frequency_increment: 1 }
    }

    pub fn record(&self, context: &str, selected: &str) -> Result<()> {
        let text = selected.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument("selected suggestion is empty".into()));
        }
        let key = SelectionKey { bucket: context_bucket(context), text: text.to_string() };
        *self.bucket_totals.entry(key.bucket.clone()).or_insert(0) += self.frequency_increment;
        *self.counts.entry(key).or_insert(0) += self.frequency_increment;
        Ok(())
    }

    pub fn frequency(&self, context: &str, text: &str) -> u64 {
        self.frequency_in_bucket(&context_bucket(context), text)
    }

    pub fn frequency_in_bucket(&self, bucket: &str, text: &str) -> u64 {
        let key = SelectionKey { bucket: bucket.to_string(), text: text.to_string() };
        self.counts.get(&key).map_or(0, |count| *count)
    }

    /// All selections recorded after contexts falling into `bucket`.
    pub fn bucket_total(&self, bucket: &str) -> u64 {
        self.bucket_totals.get(bucket).map_or(0, |total| *total)
    }

    pub fn total_selections(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All counters, sorted by key so the persisted form is stable.
    pub fn snapshot(&self) -> Vec<SelectionCount> {
        let mut counts: Vec<SelectionCount> = self
            .counts
            .iter()
            .map(|entry| SelectionCount { key: entry.key().clone(), count: *entry.value() })
            .collect();
        counts.sort_by(|a, b| a.key.cmp(&b.key));
        counts
    }

    /// Replaces every counter with `counts`.
    pub fn restore(&self, counts: Vec<SelectionCount>) {
        self.counts.clear();
        self.bucket_totals.clear();
        for SelectionCount { key, count } in counts {
            *self.bucket_totals.entry(key.bucket.clone()).or_insert(0) += count;
            self.counts.insert(key, count);
        }
    }
}

impl Default for SelectionLearner {
    fn default() -> Self {
        Self::new()
    }
}

/// The last word of the context, lowercased and cut to its final
/// `BUCKET_CHARS` characters. Empty context maps to the empty bucket.
pub fn context_bucket(context: &str) -> String {
    let last = context.split_whitespace().last().unwrap_or("").to_lowercase();
    let skip = last.chars().count().saturating_sub(BUCKET_CHARS);
    last.chars().skip(skip).collect()
}
