//! A file-backed bigram scorer.
//!
//! Stands in for the exported network when running the engine off-device:
//! the next-token logit is a unigram base plus a sparse bigram term keyed on
//! the most recent non-padding token.

use super::ScoringModel;
use crate::core::types::{TokenId, PAD_TOKEN};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

fn default_logit() -> f32 {
    -10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigramScorer {
    vocab_size: usize,
    #[serde(default = "default_logit")]
    default_logit: f32,
    /// Either empty or exactly `vocab_size` long.
    #[serde(default)]
    unigram: Vec<f32>,
    /// prev -> next -> logit added on top of the unigram base.
    #[serde(default)]
    bigrams: HashMap<TokenId, HashMap<TokenId, f32>>,
}

impl BigramScorer {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::persistence(path, e))?;
        let scorer: Self = serde_json::from_str(&text).map_err(|e| Error::persistence(path, e))?;
        scorer.validate().map_err(|e| Error::persistence(path, e))?;
        Ok(scorer)
    }

    pub fn new(vocab_size: usize, unigram: Vec<f32>) -> Result<Self> {
        let scorer = Self { vocab_size, default_logit: default_logit(), unigram, bigrams: HashMap::new() };
        scorer.validate()?;
        Ok(scorer)
    }

    pub fn with_bigram(mut self, prev: TokenId, next: TokenId, logit: f32) -> Self {
        self.bigrams.entry(prev).or_default().insert(next, logit);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(Error::ModelInvocation("vocab_size must be positive".into()));
        }
        if !self.unigram.is_empty() && self.unigram.len() != self.vocab_size {
            return Err(Error::ModelInvocation(format!(
                "unigram table has {} entries, expected {}",
                self.unigram.len(),
                self.vocab_size
            )));
        }
        let out_of_range = self.bigrams.iter().any(|(&prev, row)| {
            prev as usize >= self.vocab_size || row.keys().any(|&next| next as usize >= self.vocab_size)
        });
        if out_of_range {
            return Err(Error::ModelInvocation("bigram table references unknown token ids".into()));
        }
        Ok(())
    }
}

impl ScoringModel for BigramScorer {
    fn score(&self, ids: &[TokenId], max_len: usize) -> Result<Vec<f32>> {
        if ids.len() != max_len {
            return Err(Error::ModelInvocation(format!(
                "expected a window of {} ids, got {}",
                max_len,
                ids.len()
            )));
        }
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= self.vocab_size) {
            return Err(Error::ModelInvocation(format!("token id {} out of range", bad)));
        }

        let mut logits = if self.unigram.is_empty() {
            vec![self.default_logit; self.vocab_size]
        } else {
            self.unigram.clone()
        };
        let last = ids.iter().rev().find(|&&id| id != PAD_TOKEN);
        if let Some(row) = last.and_then(|prev| self.bigrams.get(prev)) {
            for (&next, &logit) in row {
                logits[next as usize] += logit;
            }
        }
        Ok(logits)
    }
}
