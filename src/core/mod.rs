pub mod context;
pub mod dictionary;
pub mod engine;
pub mod filter;
pub mod rules;
pub mod trie;
pub mod types;
