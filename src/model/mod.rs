//! Collaborator seams: the tokenizer and the next-token scoring model.
//!
//! The prediction engine only ever talks to these traits. Both are owned by
//! the host and lent to the engine for its lifetime.

mod scorer;
mod tokenizer;

pub use scorer::BigramScorer;
pub use tokenizer::VocabTokenizer;

use crate::core::types::TokenId;
use crate::error::Result;

/// Maps text to token ids and back.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>>;

    fn decode(&self, ids: &[TokenId]) -> Result<String>;

    fn vocab_size(&self) -> usize;

    /// Padding, unknown and other control tokens are never offered as suggestions.
    fn is_special(&self, _id: TokenId) -> bool {
        false
    }
}

/// Scores every vocabulary entry as the next token after `ids`.
pub trait ScoringModel: Send + Sync {
    /// `ids` is exactly `max_len` long, left-padded; the result must hold one
    /// logit per vocabulary entry.
    fn score(&self, ids: &[TokenId], max_len: usize) -> Result<Vec<f32>>;
}
