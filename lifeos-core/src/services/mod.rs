//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod backup;
mod key_deriver;
pub mod logging;
pub mod migration;
mod snapshot;
mod status;
mod vault;

pub use backup::{BackupService, ClearResult, RestoreResult, VerifyResult};
pub use key_deriver::KeyDeriver;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use snapshot::{ApplyResult, SnapshotService};
pub use status::{StatusService, StatusSummary};
pub use vault::VaultCodec;
