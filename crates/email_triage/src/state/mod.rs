//! Persistent state between runs
//!
//! Both stores are whole-file JSON documents rewritten on every change. A
//! missing file is empty state. Entries that do not match the current schema
//! are carried through untouched, and a file that is not valid JSON is never
//! overwritten. There is no locking: a single process is assumed to own the
//! output directory, and two concurrent runs can lose each other's updates.

pub mod deletion;
pub mod history;

pub use deletion::{process_deletions, DeletionQueue, DeletionStatus, DeletionTask, SweepSummary};
pub use history::{ResponseHistory, ResponseHistoryEntry, ResponseHistoryStore};

use serde::de::{self, DeserializeOwned};
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::warn;

use crate::error::{Result, TriageError};

/// One entry of a stored list: either a record we understand (plus any
/// fields it does not model) or whatever was in the file. Both are written
/// back without loss.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stored<T> {
    Valid(T, Map<String, Value>),
    Unrecognised(Value),
}

impl<T> Stored<T> {
    pub(crate) fn new(value: T) -> Self {
        Stored::Valid(value, Map::new())
    }

    pub(crate) fn valid(&self) -> Option<&T> {
        match self {
            Stored::Valid(value, _) => Some(value),
            Stored::Unrecognised(_) => None,
        }
    }

    pub(crate) fn valid_mut(&mut self) -> Option<&mut T> {
        match self {
            Stored::Valid(value, _) => Some(value),
            Stored::Unrecognised(_) => None,
        }
    }
}

impl<'de, T> Deserialize<'de> for Stored<T>
where
    T: DeserializeOwned + Serialize,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let Ok(value) = T::deserialize(&raw) else {
            return Ok(Stored::Unrecognised(raw));
        };
        let known = serde_json::to_value(&value).map_err(<D::Error as de::Error>::custom)?;
        let extra = match raw {
            Value::Object(fields) => fields.into_iter().filter(|(k, _)| known.get(k).is_none()).collect(),
            _ => Map::new(),
        };
        Ok(Stored::Valid(value, extra))
    }
}

impl<T: Serialize> Serialize for Stored<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Stored::Valid(value, extra) if extra.is_empty() => value.serialize(serializer),
            Stored::Valid(value, extra) => {
                let mut merged = serde_json::to_value(value).map_err(<S::Error as ser::Error>::custom)?;
                if let Value::Object(fields) = &mut merged {
                    for (k, v) in extra {
                        fields.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                merged.serialize(serializer)
            }
            Stored::Unrecognised(raw) => raw.serialize(serializer),
        }
    }
}

/// Valid entries of `entries`, warning once about the rest.
pub(crate) fn valid_entries<T: Clone>(entries: &[Stored<T>], path: &Path) -> Vec<T> {
    let valid: Vec<T> = entries.iter().filter_map(Stored::valid).cloned().collect();
    let skipped = entries.len() - valid.len();
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "State file has entries in an unknown format, leaving them as they are");
    }
    valid
}

/// Read a JSON document for a read-modify-write.
///
/// A missing or blank file is `None`. Unreadable or invalid JSON is an
/// error, so the caller never replaces a file it could not understand.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TriageError::Io(format!("Failed to read {}: {}", path.display(), e))),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| TriageError::Parse(format!("{} is not valid state ({}), leaving it untouched", path.display(), e)))
}

/// Read a JSON document for display, falling back to `T::default()` when the
/// file is missing or cannot be read.
pub(crate) fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match read_json(path) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Treating state file as empty");
            T::default()
        }
    }
}

/// Write a JSON document via a temp file and rename.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
