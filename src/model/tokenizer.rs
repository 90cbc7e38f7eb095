//! Piece-vocabulary tokenizer.
//!
//! Word-initial pieces carry a leading `▁` like SentencePiece output, so a
//! vocabulary exported from the training side can be used as is. Encoding is
//! greedy longest match inside each whitespace-separated word.

use super::Tokenizer;
use crate::core::types::TokenId;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const WORD_START: char = '▁';
const UNK_TOKEN: TokenId = 1;

#[derive(Deserialize)]
struct VocabFile {
    pieces: Vec<String>,
}

pub struct VocabTokenizer {
    pieces: Vec<String>,
    piece_to_id: HashMap<String, TokenId>,
    /// Longest piece, in chars; bounds the greedy match window.
    max_piece_chars: usize,
}

impl VocabTokenizer {
    /// Loads `{"pieces": [...]}`. Id 0 is padding and id 1 the unknown token.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::persistence(path, e))?;
        let file: VocabFile =
            serde_json::from_str(&text).map_err(|e| Error::persistence(path, e))?;
        Self::from_pieces(file.pieces)
    }

    pub fn from_pieces(pieces: Vec<String>) -> Result<Self> {
        if pieces.len() < 2 {
            return Err(Error::Tokenizer("vocabulary needs <pad> and <unk> entries".into()));
        }
        let mut piece_to_id = HashMap::with_capacity(pieces.len());
        for (id, piece) in pieces.iter().enumerate() {
            if piece.is_empty() {
                return Err(Error::Tokenizer(format!("empty piece at id {}", id)));
            }
            piece_to_id.entry(piece.clone()).or_insert(id as TokenId);
        }
        let max_piece_chars = pieces.iter().map(|p| p.chars().count()).max().unwrap_or(1);
        Ok(Self { pieces, piece_to_id, max_piece_chars })
    }

    pub fn piece(&self, id: TokenId) -> Option<&str> {
        self.pieces.get(id as usize).map(String::as_str)
    }

    fn encode_word(&self, word: &str, ids: &mut Vec<TokenId>) {
        let chars: Vec<char> = std::iter::once(WORD_START).chain(word.chars()).collect();
        let mut start = 0;
        while start < chars.len() {
            let longest = (start + self.max_piece_chars).min(chars.len());
            let matched = (start + 1..=longest).rev().find_map(|end| {
                let candidate: String = chars[start..end].iter().collect();
                self.piece_to_id.get(&candidate).map(|&id| (id, end))
            });
            match matched {
                Some((id, end)) => {
                    ids.push(id);
                    start = end;
                }
                None => {
                    // A bare word marker with no piece of its own is dropped.
                    if chars[start] != WORD_START {
                        ids.push(UNK_TOKEN);
                    }
                    start += 1;
                }
            }
        }
    }
}

impl Tokenizer for VocabTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut ids = Vec::new();
        for word in text.split_whitespace() {
            self.encode_word(word, &mut ids);
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String> {
        let mut text = String::new();
        for &id in ids {
            let piece = self
                .piece(id)
                .ok_or_else(|| Error::Tokenizer(format!("token id {} out of range", id)))?;
            if !self.is_special(id) {
                text.push_str(piece);
            }
        }
        Ok(text.replace(WORD_START, " ").trim_start().to_string())
    }

    fn vocab_size(&self) -> usize {
        self.pieces.len()
    }

    fn is_special(&self, id: TokenId) -> bool {
        self.piece(id)
            .is_some_and(|p| p.len() > 2 && p.starts_with('<') && p.ends_with('>'))
    }
}
