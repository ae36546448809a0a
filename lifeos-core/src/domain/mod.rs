//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod backup;
pub mod encryption;
pub mod result;
mod snapshot;

pub use backup::{BackupInfo, BackupMetadata, EncryptedBackup};
pub use encryption::Passphrase;
pub use result::{Error, OperationResult, VaultError};
pub use snapshot::Snapshot;
