// File: src/core/filter.rs
//! The "no meaning" classifier: rejects spam and keyboard mashing before the
//! model ever sees the input.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

const KEYBOARD_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Tunables for the pattern checks. The entropy threshold itself lives at the
/// top level of the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Entropy is only judged for inputs at least this many characters long.
    pub min_entropy_len: usize,
    /// A run of this many identical characters is mashing.
    pub max_char_run: usize,
    /// A keyboard-row walk of this length (either direction) is mashing.
    pub keyboard_run_len: usize,
    pub min_unique_ratio: f64,
    pub max_digit_ratio: f64,
    pub max_symbol_ratio: f64,
    /// Extra regexes; any match classifies the input as noise.
    pub blocked_patterns: Vec<String>,
    /// Whole inputs exempt from the keyboard-row check.
    pub keyboard_words: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_entropy_len: 4,
            max_char_run: 4,
            keyboard_run_len: 5,
            min_unique_ratio: 0.3,
            max_digit_ratio: 0.5,
            max_symbol_ratio: 0.5,
            blocked_patterns: vec![r"^[\p{P}\p{S}]{3,}$".to_string()],
            keyboard_words: ["qwerty", "qwertz"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMeaningReason {
    LowEntropy,
    CharacterRun,
    KeyboardRow,
    RepeatedUnit,
    LowDiversity,
    DigitHeavy,
    SymbolHeavy,
    MixedNoise,
    BlockedPattern(String),
}

impl fmt::Display for NoMeaningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMeaningReason::LowEntropy => f.write_str("character entropy below threshold"),
            NoMeaningReason::CharacterRun => f.write_str("long run of one character"),
            NoMeaningReason::KeyboardRow => f.write_str("keyboard row mashing"),
            NoMeaningReason::RepeatedUnit => f.write_str("repeated fragment"),
            NoMeaningReason::LowDiversity => f.write_str("too few distinct characters"),
            NoMeaningReason::DigitHeavy => f.write_str("mostly digits"),
            NoMeaningReason::SymbolHeavy => f.write_str("mostly symbols"),
            NoMeaningReason::MixedNoise => f.write_str("digits, letters and symbols mixed"),
            NoMeaningReason::BlockedPattern(p) => write!(f, "matches blocked pattern {}", p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Meaningful,
    NoMeaning(NoMeaningReason),
}

impl Verdict {
    pub fn is_meaningful(&self) -> bool {
        matches!(self, Verdict::Meaningful)
    }
}

pub struct NoMeaningFilter {
    entropy_threshold: f64,
    config: FilterConfig,
    blocked: Vec<Regex>,
    keyboard_words: HashSet<String>,
}

impl NoMeaningFilter {
    pub fn new(entropy_threshold: f64, config: FilterConfig) -> Result<Self> {
        let blocked = config
            .blocked_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::InvalidArgument(format!("blocked pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let keyboard_words = config.keyboard_words.iter().map(|w| w.trim().to_lowercase()).collect();
        Ok(Self { entropy_threshold, config, blocked, keyboard_words })
    }

    /// Pure classification of a candidate input span.
    pub fn classify(&self, input: &str) -> Verdict {
        let text = input.trim();
        if text.is_empty() {
            return Verdict::Meaningful;
        }

        if let Some(re) = self.blocked.iter().find(|re| re.is_match(text)) {
            return Verdict::NoMeaning(NoMeaningReason::BlockedPattern(re.as_str().to_string()));
        }

        let chars: Vec<char> = text.to_lowercase().chars().collect();
        if longest_run(&chars) >= self.config.max_char_run {
            return Verdict::NoMeaning(NoMeaningReason::CharacterRun);
        }
        if self.has_keyboard_walk(&chars) {
            return Verdict::NoMeaning(NoMeaningReason::KeyboardRow);
        }
        if is_repeated_unit(&chars) {
            return Verdict::NoMeaning(NoMeaningReason::RepeatedUnit);
        }
        if let Some(reason) = self.composition_check(&chars) {
            return Verdict::NoMeaning(reason);
        }
        if chars.len() >= self.config.min_entropy_len
            && normalized_entropy(text) < self.entropy_threshold
        {
            return Verdict::NoMeaning(NoMeaningReason::LowEntropy);
        }
        Verdict::Meaningful
    }

    fn has_keyboard_walk(&self, chars: &[char]) -> bool {
        let len = self.config.keyboard_run_len;
        if len < 2 || chars.len() < len {
            return false;
        }
        let text: String = chars.iter().collect();
        if self.keyboard_words.contains(&text) {
            return false;
        }
        KEYBOARD_ROWS.iter().any(|row| {
            let forward: Vec<char> = row.chars().collect();
            let backward: Vec<char> = forward.iter().rev().copied().collect();
            [forward, backward].iter().any(|row| {
                row.windows(len).any(|walk| text.contains(&walk.iter().collect::<String>()))
            })
        })
    }

    fn composition_check(&self, chars: &[char]) -> Option<NoMeaningReason> {
        let len = chars.len();
        if len <= 3 {
            return None;
        }
        let total = len as f64;
        let unique = chars.iter().collect::<HashSet<_>>().len();
        if (unique as f64) / total < self.config.min_unique_ratio {
            return Some(NoMeaningReason::LowDiversity);
        }

        let digits = chars.iter().filter(|c| c.is_numeric()).count() as f64;
        let alpha = chars.iter().filter(|c| c.is_alphabetic()).count() as f64;
        let symbols =
            chars.iter().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count() as f64;
        if digits / total > self.config.max_digit_ratio {
            return Some(NoMeaningReason::DigitHeavy);
        }
        if symbols / total > self.config.max_symbol_ratio {
            return Some(NoMeaningReason::SymbolHeavy);
        }
        if digits > 0.0 && alpha > 0.0 && symbols > 0.0 && digits / total > 0.3 && symbols / total > 0.1
        {
            return Some(NoMeaningReason::MixedNoise);
        }
        None
    }
}

/// Shannon entropy (bits) of the character distribution.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Entropy divided by its maximum for the string length, in `[0, 1]`.
/// Strings of zero or one character are treated as fully informative.
pub fn normalized_entropy(text: &str) -> f64 {
    let n = text.chars().count();
    if n <= 1 {
        return 1.0;
    }
    shannon_entropy(text) / (n as f64).log2()
}

fn longest_run(chars: &[char]) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut prev = None;
    for &ch in chars {
        if Some(ch) == prev {
            current += 1;
        } else {
            current = 1;
            prev = Some(ch);
        }
        best = best.max(current);
    }
    best
}

/// "xdxd123", "hahaha": a two or three character fragment repeated,
/// optionally followed by digits. Two repeats alone ("mama") are allowed; two
/// repeats plus a digit tail, or three or more repeats, are not. Runs of a
/// single character are left to `max_char_run`.
fn is_repeated_unit(chars: &[char]) -> bool {
    let digit_tail = chars.iter().rev().take_while(|c| c.is_ascii_digit()).count();
    let head = &chars[..chars.len() - digit_tail];
    if head.len() < 2 {
        return false;
    }
    (2..=3).any(|unit| {
        if head.len() % unit != 0 {
            return false;
        }
        let repeats = head.len() / unit;
        if repeats < 2 {
            return false;
        }
        let repeated = head.chunks(unit).all(|chunk| chunk == &head[..unit]);
        repeated && (repeats >= 3 || digit_tail >= 2)
    })
}
