// File: src/config.rs
//! Engine configuration, loaded once at startup from YAML.

use crate::core::filter::FilterConfig;
use crate::core::rules::LanguageRuleSet;
use crate::core::types::{EmojiFrequency, Formality, LanguageId};
use crate::error::{Error, Result};
use crate::logging::{Level, LOGGER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const INLINE_SOURCE: &str = "<inline>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Added to the logit of every boosted token.
    pub boost_bias: f32,
    /// Added to the logit of every suppressed token.
    pub suppress_bias: f32,
    /// Normalized character entropy below which input is noise.
    pub no_meaning_entropy_threshold: f64,
    /// Model input window, in tokens.
    pub max_sequence_length: usize,
    pub dictionary_reload_budget_ms: u64,
    /// Model candidates scoring below this are dropped.
    pub min_model_score: Option<f32>,
    pub filter: FilterConfig,
    pub languages: BTreeMap<LanguageId, LanguageRuleSet>,
    pub log_level: Level,
    pub log_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boost_bias: 0.5,
            suppress_bias: -1.0,
            no_meaning_entropy_threshold: 0.1,
            max_sequence_length: 50,
            dictionary_reload_budget_ms: 50,
            min_model_score: None,
            filter: FilterConfig::default(),
            languages: default_language_rules(),
            log_level: Level::Warn,
            log_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("failed to read: {}", e)))?;
        Self::parse(&text, path)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, Path::new(INLINE_SOURCE))
    }

    fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(text)
            .map_err(|e| Error::config(origin, format!("failed to parse YAML: {}", e)))?;
        for (id, rules) in config.languages.iter_mut() {
            rules.language_id = id.clone();
        }
        config.validate_at(origin)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_at(Path::new(INLINE_SOURCE))
    }

    fn validate_at(&self, origin: &Path) -> Result<()> {
        let fail = |message: String| Err(Error::config(origin, message));
        if !self.boost_bias.is_finite() || !self.suppress_bias.is_finite() {
            return fail("boost_bias and suppress_bias must be finite".into());
        }
        if !(0.0..=1.0).contains(&self.no_meaning_entropy_threshold) {
            return fail(format!(
                "no_meaning_entropy_threshold {} is outside [0, 1]",
                self.no_meaning_entropy_threshold
            ));
        }
        if self.max_sequence_length == 0 {
            return fail("max_sequence_length must be at least 1".into());
        }
        let ratios = [
            ("filter.min_unique_ratio", self.filter.min_unique_ratio),
            ("filter.max_digit_ratio", self.filter.max_digit_ratio),
            ("filter.max_symbol_ratio", self.filter.max_symbol_ratio),
        ];
        if let Some((name, value)) = ratios.iter().find(|(_, v)| !(0.0..=1.0).contains(v)) {
            return fail(format!("{} = {} is outside [0, 1]", name, value));
        }
        if self.min_model_score.is_some_and(|s| !s.is_finite()) {
            return fail("min_model_score must be finite".into());
        }
        if let Some(id) = self.languages.keys().find(|id| id.trim().is_empty()) {
            return fail(format!("language id '{}' is blank", id));
        }
        for pattern in &self.filter.blocked_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return fail(format!("filter.blocked_patterns '{}': {}", pattern, e));
            }
        }
        Ok(())
    }

    pub fn dictionary_reload_budget(&self) -> Duration {
        Duration::from_millis(self.dictionary_reload_budget_ms)
    }

    /// Applies the logging options to the process logger.
    pub fn apply_logging(&self) -> Result<()> {
        LOGGER.set_level(self.log_level);
        if let Some(path) = &self.log_file {
            LOGGER.attach_file(path)?;
        }
        Ok(())
    }
}

/// English and Japanese rule sets used when no configuration file is given.
pub fn default_language_rules() -> BTreeMap<LanguageId, LanguageRuleSet> {
    let mut languages = BTreeMap::new();
    languages.insert(
        "en".to_string(),
        LanguageRuleSet::new("en", Formality::Casual, EmojiFrequency::High)
            .boost(["gonna", "wanna", "lol", "omg"])
            .suppress(["whom", "thus", "hence"]),
    );
    languages.insert(
        "ja".to_string(),
        LanguageRuleSet::new("ja", Formality::Polite, EmojiFrequency::Low)
            .boost(["です", "ます", "ください", "ございます"])
            .suppress(["だ", "じゃん"]),
    );
    languages
}
