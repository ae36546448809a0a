//! LifeOS Core - encrypted backup and restore of local application state
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Snapshot, EncryptedBackup, Passphrase, errors)
//! - **ports**: Trait definitions for external dependencies (StateStore)
//! - **services**: Business logic orchestration (sealing, backups, logging)
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::DuckDbStateStore;
use config::Config;
use ports::StateStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, VaultError};
pub use domain::{BackupInfo, BackupMetadata, EncryptedBackup, Passphrase, Snapshot};

/// Name of the state database inside the lifeos directory
pub const STATE_DB_FILENAME: &str = "lifeos.duckdb";

/// Main context for LifeOS operations
///
/// This is the primary entry point for all business logic. It holds
/// the state store, configuration, and the services built on them.
pub struct LifeOsContext {
    pub config: Config,
    pub store: Arc<DuckDbStateStore>,
    pub backup_service: BackupService,
    pub status_service: StatusService,
}

impl LifeOsContext {
    /// Create a new LifeOS context rooted at `lifeos_dir`
    pub fn new(lifeos_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(lifeos_dir)?;
        let config = Config::load(lifeos_dir)?;

        let store = Arc::new(DuckDbStateStore::open(&lifeos_dir.join(STATE_DB_FILENAME))?);
        let shared: Arc<dyn StateStore> = store.clone();

        let backup_service = BackupService::new(config.backups_dir(lifeos_dir), Arc::clone(&shared));
        let status_service = StatusService::new(shared);

        Ok(Self {
            config,
            store,
            backup_service,
            status_service,
        })
    }

    /// Export a backup honoring the configured retention limit
    pub fn export_backup(&self, passphrase: &Passphrase) -> Result<BackupMetadata> {
        self.backup_service.export(passphrase, self.config.max_backups)
    }

    /// Restore a backup honoring the configured safety-backup setting
    pub fn restore_backup(&self, path: &Path, passphrase: &Passphrase) -> Result<RestoreResult> {
        self.backup_service
            .restore(path, passphrase, self.config.safety_backup_on_restore)
    }

    /// Status summary including the on-disk size of the state database
    pub fn status(&self) -> Result<StatusSummary> {
        let mut summary = self.status_service.get_status(&self.backup_service)?;
        summary.database_bytes = Some(self.store.db_size());
        Ok(summary)
    }
}
