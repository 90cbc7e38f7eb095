// File: src/core/dictionary.rs
//! Custom dictionary index with hot reload.
//!
//! Readers clone an `Arc` to the current snapshot and search it without
//! holding any lock. Every mutation builds a complete new snapshot on the
//! side and publishes it with a single pointer swap, so a reader sees either
//! the old table or the new one in full.

use crate::core::trie::{PrefixTrie, Slot};
use crate::core::types::{normalize_key, DictionaryEntry};
use crate::error::{Error, Result};
use crate::{log_debug, log_warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default rebuild latency budget.
pub const DEFAULT_RELOAD_BUDGET: Duration = Duration::from_millis(50);

/// An immutable, fully built dictionary table.
pub struct DictionarySnapshot {
    trie: PrefixTrie,
    next_seq: u64,
}

impl DictionarySnapshot {
    fn empty() -> Self {
        Self { trie: PrefixTrie::new(), next_seq: 0 }
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<DictionaryEntry> {
        let mut slots: Vec<&Slot> = self.trie.slots().iter().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn prefix_entries(&self, prefix: &str) -> Vec<DictionaryEntry> {
        let prefix = normalize_key(prefix);
        if prefix.is_empty() {
            return vec![];
        }
        self.trie.prefix_search(&prefix).into_iter().map(|slot| slot.entry.clone()).collect()
    }

    /// Entries relevant to a typed buffer: keys that extend it and keys it
    /// already extends, ranked together by priority then insertion order.
    pub fn matching_entries(&self, input: &str) -> Vec<DictionaryEntry> {
        let input = normalize_key(input);
        if input.is_empty() {
            return vec![];
        }
        let mut slots = self.trie.prefix_search(&input);
        slots.extend(self.trie.keys_prefixing(&input));
        slots.sort_by(|a, b| PrefixTrie::rank_order(a, b));
        slots.into_iter().map(|slot| slot.entry.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionaryStats {
    pub total_entries: usize,
    pub avg_key_length: f64,
    pub avg_expansion_length: f64,
}

pub struct CustomDictionary {
    current: RwLock<Arc<DictionarySnapshot>>,
    /// Serializes writers so two concurrent adds cannot drop each other's entry.
    writer: Mutex<()>,
    reload_budget: Duration,
}

impl CustomDictionary {
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_RELOAD_BUDGET)
    }

    pub fn with_budget(reload_budget: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(DictionarySnapshot::empty())),
            writer: Mutex::new(()),
            reload_budget,
        }
    }

    pub fn with_entries(entries: Vec<DictionaryEntry>) -> Result<Self> {
        let dictionary = Self::new();
        dictionary.reload(entries)?;
        Ok(dictionary)
    }

    /// The current table. Holding the returned `Arc` pins that table even if
    /// a reload publishes a new one meanwhile.
    pub fn snapshot(&self) -> Arc<DictionarySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Inserts or overwrites the entry for `key`. Last write wins.
    pub fn add(&self, key: &str, expansion: &str, priority: i64) -> Result<()> {
        let entry = validate(DictionaryEntry::new(key, expansion, priority))?;
        let started = Instant::now();
        let _guard = self.writer.lock();
        let old = self.snapshot();

        let seq = old.next_seq;
        let key = entry.key.clone();
        let slots = ordered_slots(&old)
            .into_iter()
            .filter(|slot| slot.entry.key != key)
            .chain(std::iter::once(Slot { entry, seq }));
        let trie = PrefixTrie::build(slots);
        self.publish(DictionarySnapshot { trie, next_seq: seq + 1 }, started, "add");
        Ok(())
    }

    /// Removes the entry for `key`; absent keys are a no-op.
    pub fn remove(&self, key: &str) {
        let key = normalize_key(key);
        let started = Instant::now();
        let _guard = self.writer.lock();
        let old = self.snapshot();
        if old.trie.get(&key).is_none() {
            return;
        }
        let slots = ordered_slots(&old).into_iter().filter(|slot| slot.entry.key != key);
        let trie = PrefixTrie::build(slots);
        self.publish(DictionarySnapshot { trie, next_seq: old.next_seq }, started, "remove");
    }

    /// Replaces the whole table. Every entry is validated first; on any
    /// invalid entry the current table is left untouched.
    pub fn reload(&self, entries: Vec<DictionaryEntry>) -> Result<()> {
        let started = Instant::now();
        let mut validated = Vec::with_capacity(entries.len());
        for entry in entries {
            validated.push(validate(entry)?);
        }

        // Duplicate keys: the last occurrence wins and keeps its position.
        let mut seen = HashSet::new();
        let mut slots: Vec<Slot> = validated
            .into_iter()
            .enumerate()
            .rev()
            .filter(|(_, entry)| seen.insert(entry.key.clone()))
            .map(|(seq, entry)| Slot { entry, seq: seq as u64 })
            .collect();
        slots.reverse();
        let next_seq = slots.last().map_or(0, |slot| slot.seq + 1);

        let _guard = self.writer.lock();
        let trie = PrefixTrie::build(slots);
        self.publish(DictionarySnapshot { trie, next_seq }, started, "reload");
        Ok(())
    }

    /// Hot-reloads the table from a persisted dictionary file.
    pub fn reload_from_file(&self, path: &Path) -> Result<()> {
        let entries = crate::persistence::load_dictionary(path)?;
        self.reload(entries)
    }

    /// Expansions of every entry whose key starts with `prefix`, by
    /// descending priority then insertion order. Empty prefixes yield nothing.
    pub fn prefix_search(&self, prefix: &str) -> Vec<String> {
        self.prefix_entries(prefix).into_iter().map(|entry| entry.expansion).collect()
    }

    pub fn prefix_entries(&self, prefix: &str) -> Vec<DictionaryEntry> {
        self.snapshot().prefix_entries(prefix)
    }

    pub fn matching_entries(&self, input: &str) -> Vec<DictionaryEntry> {
        self.snapshot().matching_entries(input)
    }

    /// Like `prefix_search` but stops after `max_results`.
    pub fn prefix_search_limited(&self, prefix: &str, max_results: usize) -> Vec<String> {
        let prefix = normalize_key(prefix);
        if prefix.is_empty() {
            return vec![];
        }
        let snapshot = self.snapshot();
        snapshot
            .trie
            .top_k(&prefix, max_results)
            .into_iter()
            .map(|slot| slot.entry.expansion.clone())
            .collect()
    }

    /// Exact match on the normalized key.
    pub fn get(&self, key: &str) -> Option<String> {
        let snapshot = self.snapshot();
        snapshot.trie.get(&normalize_key(key)).map(|slot| slot.entry.expansion.clone())
    }

    /// Entries in insertion order; feeding them back to `reload` reproduces the table.
    pub fn entries(&self) -> Vec<DictionaryEntry> {
        self.snapshot().entries()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn stats(&self) -> DictionaryStats {
        let snapshot = self.snapshot();
        let slots = snapshot.trie.slots();
        let total = slots.len();
        let denom = total.max(1) as f64;
        let key_chars: usize = slots.iter().map(|s| s.entry.key.chars().count()).sum();
        let value_chars: usize = slots.iter().map(|s| s.entry.expansion.chars().count()).sum();
        DictionaryStats {
            total_entries: total,
            avg_key_length: key_chars as f64 / denom,
            avg_expansion_length: value_chars as f64 / denom,
        }
    }

    fn publish(&self, snapshot: DictionarySnapshot, started: Instant, op: &str) {
        let entries = snapshot.len();
        let retired = std::mem::replace(&mut *self.current.write(), Arc::new(snapshot));
        // The old table is freed outside the lock.
        drop(retired);
        let elapsed = started.elapsed();
        if elapsed > self.reload_budget {
            log_warn!(
                "dictionary {} took {:?} for {} entries (budget {:?})",
                op,
                elapsed,
                entries,
                self.reload_budget
            );
        } else {
            log_debug!("dictionary {}: {} entries in {:?}", op, entries, elapsed);
        }
    }
}

impl Default for CustomDictionary {
    fn default() -> Self {
        Self::new()
    }
}

fn ordered_slots(snapshot: &DictionarySnapshot) -> Vec<Slot> {
    let mut slots = snapshot.trie.slots().to_vec();
    slots.sort_by_key(|slot| slot.seq);
    slots
}

fn validate(entry: DictionaryEntry) -> Result<DictionaryEntry> {
    let key = normalize_key(&entry.key);
    if key.is_empty() {
        return Err(Error::InvalidArgument("dictionary key must not be empty".into()));
    }
    let expansion = entry.expansion.trim().to_string();
    if expansion.is_empty() {
        return Err(Error::InvalidArgument(format!("expansion for key '{}' is empty", key)));
    }
    Ok(DictionaryEntry { key, expansion, priority: entry.priority })
}

/// The common chat abbreviations shipped as the starter dictionary.
pub fn default_entries() -> Vec<DictionaryEntry> {
    [
        ("ty", "thank you"),
        ("brb", "be right back"),
        ("omw", "on my way"),
        ("idk", "I don't know"),
        ("tbh", "to be honest"),
        ("imo", "in my opinion"),
        ("btw", "by the way"),
        ("fyi", "for your information"),
        ("asap", "as soon as possible"),
        ("lmk", "let me know"),
        ("nvm", "never mind"),
        ("gtg", "got to go"),
        ("ttyl", "talk to you later"),
        ("np", "no problem"),
        ("yw", "you're welcome"),
        ("gg", "good game"),
        ("afk", "away from keyboard"),
        ("dm", "direct message"),
        ("irl", "in real life"),
    ]
    .into_iter()
    .map(|(key, expansion)| DictionaryEntry::new(key, expansion, 1))
    .collect()
}
