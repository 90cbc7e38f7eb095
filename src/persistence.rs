// File: src/persistence.rs
use crate::core::types::DictionaryEntry;
use crate::error::{Error, Result};
use crate::learning::{SelectionCount, SelectionLearner};
use crate::log_info;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const DICTIONARY_FORMAT_VERSION: &str = "1.0";

/// On-disk dictionary table. Entries are stored as a list in insertion order
/// so equal-priority ties survive a save/load cycle.
#[derive(Serialize, Deserialize)]
struct DictionaryFile {
    #[serde(default = "default_version")]
    version: String,
    entries: StoredEntries,
}

fn default_version() -> String {
    DICTIONARY_FORMAT_VERSION.to_string()
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntries {
    Ordered(Vec<DictionaryEntry>),
    /// Older tables keyed by trigger: `{"ty": {"value": "thank you", "priority": 1}}`.
    /// Read in file order, which decides equal-priority ties.
    Keyed(serde_json::Map<String, serde_json::Value>),
}

#[derive(Serialize, Deserialize)]
struct KeyedEntry {
    value: String,
    #[serde(default = "default_priority")]
    priority: i64,
}

fn default_priority() -> i64 {
    1
}

/// The persisted learning state.
#[derive(Serialize, Deserialize)]
struct LearningState {
    counts: Vec<SelectionCount>,
}

/// Writes to a temp file in the target directory, then renames it into place.
fn write_atomically(path: &Path, write: impl FnOnce(&mut BufWriter<&NamedTempFile>) -> Result<()>) -> Result<()> {
    let parent_dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        write(&mut writer)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| Error::persistence(path, e.error))?;
    Ok(())
}

pub fn save_dictionary(path: &Path, entries: &[DictionaryEntry]) -> Result<()> {
    let file = DictionaryFile {
        version: default_version(),
        entries: StoredEntries::Ordered(entries.to_vec()),
    };
    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(writer, &file).map_err(|e| Error::persistence(path, e))
    })?;
    log_info!("saved {} dictionary entries to {}", entries.len(), path.display());
    Ok(())
}

/// Reads a dictionary table. Entries are returned as stored; the dictionary
/// validates them when they are loaded into it.
pub fn load_dictionary(path: &Path) -> Result<Vec<DictionaryEntry>> {
    let file = File::open(path).map_err(|e| Error::persistence(path, e))?;
    let stored: DictionaryFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::persistence(path, e))?;
    if stored.version != DICTIONARY_FORMAT_VERSION {
        return Err(Error::persistence(path, format!("unsupported version {}", stored.version)));
    }
    let entries = match stored.entries {
        StoredEntries::Ordered(entries) => entries,
        StoredEntries::Keyed(map) => map
            .into_iter()
            .map(|(key, value)| {
                let entry: KeyedEntry =
                    serde_json::from_value(value).map_err(|e| Error::persistence(path, e))?;
                Ok(DictionaryEntry::new(key, entry.value, entry.priority))
            })
            .collect::<Result<Vec<_>>>()?,
    };
    log_info!("loaded {} dictionary entries from {}", entries.len(), path.display());
    Ok(entries)
}

pub fn save_learning(path: &Path, learner: &SelectionLearner) -> Result<()> {
    let state = LearningState { counts: learner.snapshot() };
    write_atomically(path, |writer| {
        bincode::serialize_into(writer, &state).map_err(|e| Error::persistence(path, e))
    })?;
    log_info!("saved {} selection counters to {}", state.counts.len(), path.display());
    Ok(())
}

pub fn load_learning(path: &Path, learner: &SelectionLearner) -> Result<()> {
    let file = File::open(path).map_err(|e| Error::persistence(path, e))?;
    let state: LearningState = bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| Error::persistence(path, e))?;
    log_info!("loaded {} selection counters from {}", state.counts.len(), path.display());
    learner.restore(state.counts);
    Ok(())
}
