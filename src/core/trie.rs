// --- File: src/core/trie.rs
use crate::core::types::DictionaryEntry;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Clone)]
struct TrieNode {
    children: HashMap<char, usize>,
    slot: Option<usize>,
    max_priority_in_subtree: i64,
}

impl TrieNode {
    fn new() -> Self {
        Self { children: HashMap::new(), slot: None, max_priority_in_subtree: i64::MIN }
    }
}

/// A stored entry plus the insertion sequence used to break priority ties.
#[derive(Debug, Clone)]
pub struct Slot {
    pub entry: DictionaryEntry,
    pub seq: u64,
}

impl Slot {
    /// Higher is better: priority first, then earlier insertion.
    fn rank(&self) -> (i64, Reverse<u64>) {
        (self.entry.priority, Reverse(self.seq))
    }
}

/// A character trie over normalized dictionary keys.
///
/// The trie is built once and then only read; the dictionary index swaps in
/// a freshly built trie on every mutation.
#[derive(Clone)]
pub struct PrefixTrie {
    nodes: Vec<TrieNode>,
    slots: Vec<Slot>,
}

impl PrefixTrie {
    pub fn new() -> Self {
        Self { nodes: vec![TrieNode::new()], slots: Vec::new() }
    }

    /// Builds a trie from entries with unique keys.
    pub fn build(slots: impl IntoIterator<Item = Slot>) -> Self {
        let mut trie = Self::new();
        for slot in slots {
            trie.insert(slot);
        }
        trie
    }

    /// Inserts an entry, replacing any slot already stored under its key.
    /// O(k) complexity where k is key length.
    pub fn insert(&mut self, slot: Slot) {
        let priority = slot.entry.priority;
        let mut node_idx = 0;
        self.nodes[0].max_priority_in_subtree = self.nodes[0].max_priority_in_subtree.max(priority);
        for ch in slot.entry.key.chars() {
            let next_idx = match self.nodes[node_idx].children.get(&ch) {
                Some(&id) => id,
                None => {
                    let new_node_id = self.nodes.len();
                    self.nodes.push(TrieNode::new());
                    self.nodes[node_idx].children.insert(ch, new_node_id);
                    new_node_id
                }
            };
            node_idx = next_idx;
            let node = &mut self.nodes[node_idx];
            node.max_priority_in_subtree = node.max_priority_in_subtree.max(priority);
        }

        match self.nodes[node_idx].slot {
            Some(existing) => self.slots[existing] = slot,
            None => {
                self.nodes[node_idx].slot = Some(self.slots.len());
                self.slots.push(slot);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All stored slots, in insertion order of the build.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, key: &str) -> Option<&Slot> {
        let node_idx = self.descend(key)?;
        self.nodes[node_idx].slot.map(|idx| &self.slots[idx])
    }

    /// Every entry whose key starts with `prefix`, best ranked first.
    pub fn prefix_search(&self, prefix: &str) -> Vec<&Slot> {
        let Some(node_idx) = self.descend(prefix) else {
            return vec![];
        };
        let mut found = Vec::new();
        self.collect(node_idx, &mut found);
        found.sort_by(|a, b| b.rank().cmp(&a.rank()));
        found
    }

    /// Entries whose key is a proper prefix of `query`, shortest key first.
    pub fn keys_prefixing(&self, query: &str) -> Vec<&Slot> {
        let mut found = Vec::new();
        let mut node_idx = 0;
        for ch in query.chars() {
            if let Some(idx) = self.nodes[node_idx].slot {
                found.push(&self.slots[idx]);
            }
            match self.nodes[node_idx].children.get(&ch) {
                Some(&next) => node_idx = next,
                None => break,
            }
        }
        found
    }

    /// Top `k` entries under `prefix`, pruning subtrees that cannot beat the
    /// current k-th best priority.
    /// O(p + S log k) where S is the number of nodes visited.
    pub fn top_k(&self, prefix: &str, k: usize) -> Vec<&Slot> {
        if k == 0 {
            return vec![];
        }
        let Some(node_idx) = self.descend(prefix) else {
            return vec![];
        };
        let mut heap = BinaryHeap::new();
        self.dfs_search(node_idx, k, &mut heap);
        // Min-heap of Reverse keys sorts best-first.
        heap.into_sorted_vec().into_iter().map(|Reverse((_, idx))| &self.slots[idx]).collect()
    }

    pub(crate) fn rank_order(a: &Slot, b: &Slot) -> std::cmp::Ordering {
        b.rank().cmp(&a.rank())
    }

    fn descend(&self, prefix: &str) -> Option<usize> {
        let mut node_idx = 0;
        for ch in prefix.chars() {
            node_idx = *self.nodes[node_idx].children.get(&ch)?;
        }
        Some(node_idx)
    }

    fn collect<'a>(&'a self, node_idx: usize, found: &mut Vec<&'a Slot>) {
        let node = &self.nodes[node_idx];
        if let Some(idx) = node.slot {
            found.push(&self.slots[idx]);
        }
        for &child_idx in node.children.values() {
            self.collect(child_idx, found);
        }
    }

    fn dfs_search(
        &self,
        node_idx: usize,
        k: usize,
        heap: &mut BinaryHeap<Reverse<((i64, Reverse<u64>), usize)>>,
    ) {
        let node = &self.nodes[node_idx];
        if let Some(idx) = node.slot {
            let key = self.slots[idx].rank();
            if heap.len() < k {
                heap.push(Reverse((key, idx)));
            } else if heap.peek().is_some_and(|Reverse((worst, _))| key > *worst) {
                heap.pop();
                heap.push(Reverse((key, idx)));
            }
        }

        for &child_idx in node.children.values() {
            // Equal priority may still win on insertion order, so prune only on strictly lower.
            let prune = heap.len() == k
                && heap.peek().is_some_and(|Reverse(((worst, _), _))| {
                    self.nodes[child_idx].max_priority_in_subtree < *worst
                });
            if !prune {
                self.dfs_search(child_idx, k, heap);
            }
        }
    }
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}
