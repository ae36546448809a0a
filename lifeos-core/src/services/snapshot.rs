//! Snapshot service - captures the state store as one value and puts it back
//!
//! Stored values are strings. Strings holding a JSON document (object,
//! array, number, bool, null) are embedded structurally so the snapshot
//! reads like the application state; everything else, including strings
//! whose content is itself a JSON string literal, is embedded verbatim.
//! `apply` reverses the mapping, so a collect/apply round trip reproduces
//! every stored value up to formatting inside JSON documents (whitespace,
//! object key order, number notation).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::result::{Error, Result};
use crate::domain::Snapshot;
use crate::ports::StateStore;

/// Result of applying a snapshot to a store
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    /// Keys written from the snapshot
    pub keys_restored: usize,
    /// Keys that existed before and are absent from the snapshot
    pub keys_removed: usize,
}

/// Converts between a StateStore and a Snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotService;

impl SnapshotService {
    /// Capture every key in the store
    pub fn collect(&self, store: &dyn StateStore) -> Result<Snapshot> {
        let mut map = Map::new();
        for (key, raw) in store.entries()? {
            map.insert(key, embed(raw));
        }
        Ok(Snapshot::new(Value::Object(map)))
    }

    /// Replace the store's contents with the snapshot, atomically.
    ///
    /// A snapshot that is not a JSON object cannot be mapped onto keys; it
    /// is rejected before the store is touched.
    pub fn apply(&self, store: &dyn StateStore, snapshot: &Snapshot) -> Result<ApplyResult> {
        let Value::Object(map) = snapshot.as_value() else {
            return Err(Error::validation(
                "Backup does not contain key/value application state",
            ));
        };

        let entries: Vec<(String, String)> = map
            .iter()
            .map(|(key, value)| (key.clone(), extract(value)))
            .collect();

        let keys_removed = store
            .keys()?
            .iter()
            .filter(|key| !map.contains_key(key.as_str()))
            .count();

        store.replace_all(&entries)?;

        Ok(ApplyResult {
            keys_restored: entries.len(),
            keys_removed,
        })
    }
}

fn embed(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::String(_)) | Err(_) => Value::String(raw),
        Ok(document) => document,
    }
}

fn extract(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        document => document.to_string(),
    }
}
