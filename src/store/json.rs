//! JSON state document with legacy-shape upgrade.
//!
//! Current shape:
//!
//! ```json
//! {
//!   "schema_version": 2,
//!   "feeds": { "fb_Beta": { "title": "...", "url": "..." } },
//!   "destinations": ["group:1"]
//! }
//! ```
//!
//! Legacy shape (no `schema_version`): every top-level key is a feed name mapped to
//! the last seen title, plus an optional `target_sessions` list.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::app::PersistenceError;
use crate::domain::{Snapshot, VersionRecord};
use crate::store::{PersistedState, StateStore};

pub const SCHEMA_VERSION: u64 = 2;
const LEGACY_DESTINATIONS_KEY: &str = "target_sessions";

#[derive(Serialize)]
struct StateDocument<'a> {
    schema_version: u64,
    feeds: &'a VersionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    destinations: Option<&'a [String]>,
}

pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<PersistedState, PersistenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => decode_state(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting fresh", self.path.display());
                Ok(PersistedState::default())
            }
            Err(source) => Err(PersistenceError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes to a sibling temp file and renames it into place.
    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let bytes = encode_state(state)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(&bytes).map_err(|e| self.write_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_error(e.error))?;

        Ok(())
    }
}

pub fn encode_state(state: &PersistedState) -> Result<Vec<u8>, PersistenceError> {
    let doc = StateDocument {
        schema_version: SCHEMA_VERSION,
        feeds: &state.versions,
        destinations: state.destinations.as_deref(),
    };
    serde_json::to_vec_pretty(&doc).map_err(|e| PersistenceError::CorruptSchema(e.to_string()))
}

/// Decodes either document shape. Bad individual entries are dropped, not fatal.
pub fn decode_state(bytes: &[u8]) -> Result<PersistedState, PersistenceError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::CorruptSchema(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(PersistenceError::CorruptSchema(
            "expected a JSON object at the top level".into(),
        ));
    };

    match map.get("schema_version").map(Value::as_u64) {
        None => Ok(decode_legacy(map)),
        Some(Some(version)) => {
            if version > SCHEMA_VERSION {
                warn!(
                    "State file has schema version {} (newer than {}), reading known fields",
                    version, SCHEMA_VERSION
                );
            }
            Ok(decode_current(map))
        }
        Some(None) => Err(PersistenceError::CorruptSchema(
            "schema_version is not an integer".into(),
        )),
    }
}

fn decode_current(mut map: Map<String, Value>) -> PersistedState {
    let versions = match map.remove("feeds") {
        Some(Value::Object(feeds)) => feeds
            .into_iter()
            .filter_map(|(name, value)| decode_entry(&name, value).map(|s| (name, s)))
            .collect(),
        Some(other) => {
            warn!("Ignoring non-object feeds section: {}", other);
            VersionRecord::new()
        }
        None => VersionRecord::new(),
    };

    let destinations = map.remove("destinations").and_then(decode_destinations);

    PersistedState {
        versions,
        destinations,
    }
}

fn decode_legacy(map: Map<String, Value>) -> PersistedState {
    debug!("Upgrading legacy state document");

    let mut versions = VersionRecord::new();
    let mut destinations = None;

    for (key, value) in map {
        if key == LEGACY_DESTINATIONS_KEY {
            destinations = decode_destinations(value);
        } else if let Some(snapshot) = decode_entry(&key, value) {
            versions.insert(key, snapshot);
        }
    }

    PersistedState {
        versions,
        destinations,
    }
}

fn decode_entry(name: &str, value: Value) -> Option<Snapshot> {
    match value {
        // Legacy placeholder for "never seen".
        Value::String(title) if title.is_empty() => None,
        Value::String(title) => Some(Snapshot::new(title, "")),
        Value::Null => None,
        value @ Value::Object(_) => match serde_json::from_value::<Snapshot>(value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Dropping unreadable record for feed {}: {}", name, e);
                None
            }
        },
        other => {
            warn!("Dropping unexpected record for feed {}: {}", name, other);
            None
        }
    }
}

fn decode_destinations(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) if !id.is_empty() => Some(id),
                    other => {
                        warn!("Dropping invalid destination entry: {}", other);
                        None
                    }
                })
                .collect(),
        ),
        other => {
            warn!("Ignoring non-list destinations: {}", other);
            None
        }
    }
}
