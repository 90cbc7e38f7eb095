// File: src/core/rules.rs
use crate::config::EngineConfig;
use crate::core::filter::{NoMeaningFilter, Verdict};
use crate::core::types::{EmojiFrequency, Formality, LanguageId, TokenId};
use crate::error::{Error, Result};
use crate::model::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stylistic rules for one language. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageRuleSet {
    /// Filled from the configuration key when loaded from YAML.
    pub language_id: LanguageId,
    pub formality: Formality,
    pub emoji_frequency: EmojiFrequency,
    pub boost_tokens: BTreeSet<String>,
    pub suppress_tokens: BTreeSet<String>,
}

impl LanguageRuleSet {
    pub fn new(language_id: &str, formality: Formality, emoji_frequency: EmojiFrequency) -> Self {
        Self { language_id: language_id.to_string(), formality, emoji_frequency, ..Default::default() }
    }

    /// A rule set that changes nothing.
    pub fn neutral(language_id: &str) -> Self {
        Self { language_id: language_id.to_string(), ..Default::default() }
    }

    pub fn boost<'a>(mut self, tokens: impl IntoIterator<Item = &'a str>) -> Self {
        self.boost_tokens.extend(tokens.into_iter().map(str::to_string));
        self
    }

    pub fn suppress<'a>(mut self, tokens: impl IntoIterator<Item = &'a str>) -> Self {
        self.suppress_tokens.extend(tokens.into_iter().map(str::to_string));
        self
    }
}

/// Per-language logit offsets resolved to token ids for one tokenizer.
#[derive(Debug, Clone, Default)]
pub struct LogitBias {
    per_language: HashMap<LanguageId, Vec<(TokenId, f32)>>,
}

impl LogitBias {
    pub fn offsets(&self, language: &str) -> &[(TokenId, f32)] {
        self.per_language.get(language).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Language rules plus the no-meaning filter.
pub struct RuleEngine {
    rule_sets: BTreeMap<LanguageId, LanguageRuleSet>,
    boost_bias: f32,
    suppress_bias: f32,
    filter: NoMeaningFilter,
}

impl RuleEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let filter =
            NoMeaningFilter::new(config.no_meaning_entropy_threshold, config.filter.clone())?;
        Ok(Self {
            rule_sets: config.languages.clone(),
            boost_bias: config.boost_bias,
            suppress_bias: config.suppress_bias,
            filter,
        })
    }

    pub fn classify(&self, input: &str) -> Verdict {
        self.filter.classify(input)
    }

    pub fn rule_set(&self, language: &str) -> Result<&LanguageRuleSet> {
        self.rule_sets
            .get(language)
            .ok_or_else(|| Error::UnknownLanguage(language.to_string()))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.rule_sets.keys().map(String::as_str)
    }

    pub fn formality(&self, language: &str) -> Result<Formality> {
        Ok(self.rule_set(language)?.formality)
    }

    pub fn emoji_frequency(&self, language: &str) -> Result<EmojiFrequency> {
        Ok(self.rule_set(language)?.emoji_frequency)
    }

    pub fn should_boost_emoji(&self, language: &str) -> Result<bool> {
        Ok(self.emoji_frequency(language)? == EmojiFrequency::High)
    }

    /// Checks a caller-supplied language set and returns it deduplicated.
    /// An empty set is an unknown language, never a silent default.
    pub fn resolve<'a>(&self, languages: &[&'a str]) -> Result<BTreeSet<&'a str>> {
        if languages.is_empty() {
            return Err(Error::UnknownLanguage("<empty>".into()));
        }
        for language in languages {
            self.rule_set(language)?;
        }
        Ok(languages.iter().copied().collect())
    }

    /// Net offset for a token text under one language. A token listed as
    /// both boosted and suppressed receives both offsets.
    pub fn piece_bias(&self, language: &str, piece: &str) -> Result<f32> {
        let rules = self.rule_set(language)?;
        let mut bias = 0.0;
        if rules.boost_tokens.contains(piece) {
            bias += self.boost_bias;
        }
        if rules.suppress_tokens.contains(piece) {
            bias += self.suppress_bias;
        }
        Ok(bias)
    }

    /// Resolves every rule set's token lists against the tokenizer's
    /// vocabulary once, so adjustment costs O(1) per listed token.
    pub fn compile(&self, tokenizer: &dyn Tokenizer) -> Result<LogitBias> {
        let mut per_language: HashMap<LanguageId, Vec<(TokenId, f32)>> = self
            .rule_sets
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        for id in 0..tokenizer.vocab_size() as TokenId {
            if tokenizer.is_special(id) {
                continue;
            }
            let text = tokenizer.decode(&[id])?;
            let piece = text.trim();
            if piece.is_empty() {
                continue;
            }
            for (language, offsets) in per_language.iter_mut() {
                let bias = self.piece_bias(language, piece)?;
                if bias != 0.0 {
                    offsets.push((id, bias));
                }
            }
        }
        Ok(LogitBias { per_language })
    }

    /// Adds the offsets of every active language to `logits`. Several active
    /// languages simply sum; no renormalization happens here.
    pub fn adjust_logits(
        &self,
        logits: &mut [f32],
        languages: &BTreeSet<&str>,
        bias: &LogitBias,
    ) -> Result<()> {
        for language in languages {
            self.rule_set(language)?;
            for &(id, offset) in bias.offsets(language) {
                if let Some(logit) = logits.get_mut(id as usize) {
                    *logit += offset;
                }
            }
        }
        Ok(())
    }
}
