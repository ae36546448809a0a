//! Status service - state and backup summaries

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use super::backup::BackupService;
use crate::domain::encryption::FORMAT_DESCRIPTION;
use crate::domain::BackupMetadata;
use crate::ports::StateStore;

/// Status service for the state store and its backups
pub struct StatusService {
    store: Arc<dyn StateStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Get overall status summary
    pub fn get_status(&self, backups: &BackupService) -> Result<StatusSummary> {
        let entries = self.store.entries()?;
        let listed = backups.list()?;

        Ok(StatusSummary {
            total_keys: entries.len(),
            stored_bytes: entries.iter().map(|(k, v)| k.len() + v.len()).sum(),
            total_backups: listed.len(),
            latest_backup: listed.into_iter().find(|b| !b.pre_restore),
            backup_format: FORMAT_DESCRIPTION,
            database_bytes: None,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_keys: usize,
    /// Sum of key and value lengths, in bytes
    pub stored_bytes: usize,
    pub total_backups: usize,
    /// Newest backup the user exported (pre-restore copies excluded)
    pub latest_backup: Option<BackupMetadata>,
    pub backup_format: &'static str,
    /// Size of the backing database file, when the store has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_bytes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use crate::domain::Passphrase;
    use tempfile::TempDir;

    #[test]
    fn test_status_counts_keys_and_backups() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn StateStore> =
            Arc::new(MemoryStateStore::with_entries([("goals", "[]"), ("mood", "5")]));
        let backups = BackupService::new(dir.path().join("backups"), Arc::clone(&store));
        let status = StatusService::new(Arc::clone(&store));

        let empty = status.get_status(&backups).unwrap();
        assert_eq!(empty.total_keys, 2);
        assert_eq!(empty.stored_bytes, "goals[]mood5".len());
        assert_eq!(empty.total_backups, 0);
        assert!(empty.latest_backup.is_none());
        assert!(empty.database_bytes.is_none());

        let exported = backups.export(&Passphrase::new("pw").unwrap(), None).unwrap();
        let summary = status.get_status(&backups).unwrap();
        assert_eq!(summary.total_backups, 1);
        assert_eq!(summary.latest_backup.unwrap().name, exported.name);
        assert_eq!(summary.backup_format, "pbkdf2-sha256/aes-256-gcm v1");
    }
}
