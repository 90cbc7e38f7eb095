// src/core/types.rs
use serde::{Deserialize, Serialize};

/// Identifies a vocabulary entry; always in `[0, vocab_size)`.
pub type TokenId = u32;

/// Language ids are the keys of the rule-set table, e.g. "en" or "ja".
pub type LanguageId = String;

/// Token id used for left padding of the model input window.
pub const PAD_TOKEN: TokenId = 0;

/// A user-defined text expansion, the "value" in the custom dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Lowercased, trimmed trigger key (e.g. "ty").
    pub key: String,
    /// Text offered to the user (e.g. "thank you").
    pub expansion: String,
    /// Higher ranks first among entries sharing a prefix.
    #[serde(default = "default_priority")]
    pub priority: i64,
}

fn default_priority() -> i64 {
    1
}

impl DictionaryEntry {
    pub fn new(key: impl Into<String>, expansion: impl Into<String>, priority: i64) -> Self {
        Self { key: key.into(), expansion: expansion.into(), priority }
    }
}

/// Lowercases and trims a dictionary key or a lookup prefix.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Dictionary,
    Model,
}

/// One ranked suggestion. Dictionary suggestions carry their priority as the
/// score; model suggestions carry the bias-adjusted logit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub source: SuggestionSource,
    pub score: f32,
}

impl Suggestion {
    pub fn dictionary(text: impl Into<String>, priority: i64) -> Self {
        Self { text: text.into(), source: SuggestionSource::Dictionary, score: priority as f32 }
    }

    pub fn model(text: impl Into<String>, score: f32) -> Self {
        Self { text: text.into(), source: SuggestionSource::Model, score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    #[default]
    Casual,
    Polite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmojiFrequency {
    #[default]
    Low,
    High,
}
