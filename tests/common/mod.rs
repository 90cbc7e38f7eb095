//! Test doubles for the tokenizer and scoring model.
#![allow(dead_code)]

use predict_core::core::types::TokenId;
use predict_core::model::{ScoringModel, Tokenizer};
use predict_core::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Whole-word vocabulary. Ids 0 and 1 are padding and unknown.
pub struct WordTokenizer {
    words: Vec<String>,
    pub encode_calls: AtomicUsize,
    pub decode_calls: AtomicUsize,
}

impl WordTokenizer {
    pub fn new(words: &[&str]) -> Self {
        let mut all = vec!["<pad>".to_string(), "<unk>".to_string()];
        all.extend(words.iter().map(|w| w.to_string()));
        Self { words: all, encode_calls: AtomicUsize::new(0), decode_calls: AtomicUsize::new(0) }
    }

    pub fn id(&self, word: &str) -> TokenId {
        self.words.iter().position(|w| w == word).map_or(1, |i| i as TokenId)
    }

    pub fn encode_count(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn decode_count(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }
}

impl Tokenizer for WordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.split_whitespace().map(|w| self.id(w)).collect())
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::new();
        for &id in ids {
            let word = self
                .words
                .get(id as usize)
                .ok_or_else(|| Error::Tokenizer(format!("unknown id {}", id)))?;
            if !self.is_special(id) {
                out.push(word.as_str());
            }
        }
        Ok(out.join(" "))
    }

    fn vocab_size(&self) -> usize {
        self.words.len()
    }

    fn is_special(&self, id: TokenId) -> bool {
        id < 2
    }
}

/// A word tokenizer that can be switched to fail after the engine is built.
/// Its errors are not tokenizer errors, so the engine has to classify them.
pub struct FlakyTokenizer {
    inner: WordTokenizer,
    pub fail_encode: AtomicBool,
    pub fail_decode: AtomicBool,
}

impl FlakyTokenizer {
    pub fn new(words: &[&str]) -> Self {
        Self {
            inner: WordTokenizer::new(words),
            fail_encode: AtomicBool::new(false),
            fail_decode: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &WordTokenizer {
        &self.inner
    }
}

impl Tokenizer for FlakyTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        if self.fail_encode.load(Ordering::SeqCst) {
            return Err(Error::InvalidArgument("vocabulary file went away".into()));
        }
        self.inner.encode(text)
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String> {
        if self.fail_decode.load(Ordering::SeqCst) {
            return Err(Error::InvalidArgument("vocabulary file went away".into()));
        }
        self.inner.decode(ids)
    }

    fn vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }

    fn is_special(&self, id: TokenId) -> bool {
        self.inner.is_special(id)
    }
}

/// Returns fixed logits and counts how often it was asked.
pub struct CountingModel {
    logits: Vec<f32>,
    calls: AtomicUsize,
    pub last_input: parking_lot::Mutex<Vec<TokenId>>,
}

impl CountingModel {
    pub fn new(logits: Vec<f32>) -> Self {
        Self { logits, calls: AtomicUsize::new(0), last_input: parking_lot::Mutex::new(Vec::new()) }
    }

    /// Logits for `tokenizer`'s vocabulary: listed words get their score,
    /// everything else a very low one.
    pub fn scoring(tokenizer: &WordTokenizer, scores: &[(&str, f32)]) -> Self {
        let mut logits = vec![-100.0; tokenizer.vocab_size()];
        for &(word, score) in scores {
            logits[tokenizer.id(word) as usize] = score;
        }
        Self::new(logits)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScoringModel for CountingModel {
    fn score(&self, ids: &[TokenId], max_len: usize) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ids.len() != max_len {
            return Err(Error::ModelInvocation(format!("got {} ids, expected {}", ids.len(), max_len)));
        }
        *self.last_input.lock() = ids.to_vec();
        Ok(self.logits.clone())
    }
}

/// A model that always fails.
pub struct BrokenModel;

impl ScoringModel for BrokenModel {
    fn score(&self, _ids: &[TokenId], _max_len: usize) -> Result<Vec<f32>> {
        Err(Error::ModelInvocation("weights not loaded".into()))
    }
}
