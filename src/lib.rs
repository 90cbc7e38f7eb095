// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod learning;
pub mod logging;
pub mod model;
pub mod persistence;

pub use crate::config::EngineConfig;
pub use crate::core::dictionary::CustomDictionary;
pub use crate::core::engine::PredictionEngine;
pub use crate::core::types::{DictionaryEntry, Suggestion, SuggestionSource};
pub use crate::error::{Error, Result};
