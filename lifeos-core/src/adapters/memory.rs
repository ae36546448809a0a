//! In-process state store

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::result::{Error, Result};
use crate::ports::StateStore;

/// State held in a sorted map; nothing touches disk
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from existing entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .read()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .write()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    fn entries(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .read()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn replace_all(&self, entries: &[(String, String)]) -> Result<()> {
        // Build the new map first so the swap under the lock cannot fail midway
        let replacement: BTreeMap<String, String> = entries.iter().cloned().collect();
        *self.write()? = replacement;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStateStore::with_entries([("habits", "[]")]);
        assert_eq!(store.get("habits").unwrap().as_deref(), Some("[]"));

        store.set("journal", "[\"day one\"]").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["habits", "journal"]);

        assert!(store.remove("habits").unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_replace_all() {
        let store = MemoryStateStore::with_entries([("a", "1"), ("b", "2")]);
        store
            .replace_all(&[("c".to_string(), "3".to_string())])
            .unwrap();
        assert_eq!(
            store.entries().unwrap(),
            vec![("c".to_string(), "3".to_string())]
        );
    }
}
