//! State store port - the application's local key/value storage

use crate::domain::result::Result;

/// Opaque get/set string store holding all application state.
///
/// Every feature (goals, habits, journal, cycle tracking, finances,
/// settings) persists its data as string values under its own keys.
/// Backups snapshot the whole store; restores replace it wholesale.
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool>;

    /// All entries, sorted by key
    fn entries(&self) -> Result<Vec<(String, String)>>;

    /// Replace the entire contents atomically.
    ///
    /// Either every previous entry is gone and exactly `entries` remain,
    /// or the store is unchanged.
    fn replace_all(&self, entries: &[(String, String)]) -> Result<()>;

    /// All keys, sorted
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    /// Number of stored keys
    fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
