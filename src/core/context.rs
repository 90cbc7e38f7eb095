// File: src/core/context.rs
use crate::core::types::{TokenId, PAD_TOKEN};
use crate::error::{Error, Result};
use crate::model::Tokenizer;
use std::collections::VecDeque;

/// Builds the fixed-length model input from the preceding context and the
/// current input buffer.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    window_size: usize,
}

impl ContextWindow {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Tokenizes `context + input` and fits it to the window.
    pub fn build(&self, tokenizer: &dyn Tokenizer, context: &str, input: &str) -> Result<Vec<TokenId>> {
        let mut text = String::with_capacity(context.len() + input.len());
        text.push_str(context);
        text.push_str(input);
        let ids = tokenizer.encode(&text).map_err(|e| match e {
            Error::Tokenizer(_) => e,
            other => Error::Tokenizer(other.to_string()),
        })?;
        Ok(self.fit(&ids))
    }

    /// Keeps the most recent `window_size` ids and left-pads with the padding
    /// token, so the newest token always sits in the last position.
    pub fn fit(&self, ids: &[TokenId]) -> Vec<TokenId> {
        let mut history: VecDeque<TokenId> = VecDeque::with_capacity(self.window_size);
        for &id in ids {
            if history.len() == self.window_size {
                history.pop_front();
            }
            history.push_back(id);
        }
        while history.len() < self.window_size {
            history.push_front(PAD_TOKEN);
        }
        history.into()
    }
}
