//! Backup service - encrypted export and restore of application state
//!
//! Each backup is one sealed snapshot of the state store, written as a
//! `.vaultbackup` JSON document under the backups directory. Restoring
//! decrypts first and only then touches the store, so a wrong passphrase
//! or a damaged file never costs the user their current data.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;

use super::snapshot::SnapshotService;
use super::vault::VaultCodec;
use crate::domain::encryption::BACKUP_EXTENSION;
use crate::domain::{
    BackupInfo, BackupMetadata, EncryptedBackup, Error, Passphrase, Snapshot, VaultError,
};
use crate::ports::StateStore;

const BACKUP_PREFIX: &str = "lifeos-";
const PRE_RESTORE_PREFIX: &str = "lifeos-pre-restore-";

/// Browser exports are saved with a .json extension
const LEGACY_EXTENSION: &str = "json";

/// Backup service for sealed state snapshots
pub struct BackupService {
    backups_dir: PathBuf,
    store: Arc<dyn StateStore>,
    codec: VaultCodec,
    snapshots: SnapshotService,
}

/// Outcome of a successful restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub keys_restored: usize,
    pub keys_removed: usize,
    /// Copy of the state as it was before the restore, if one was taken
    pub safety_backup: Option<BackupMetadata>,
}

/// Outcome of a successful verify
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub info: BackupInfo,
    /// Top-level entries in the decrypted snapshot
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub deleted: usize,
}

impl BackupService {
    pub fn new(backups_dir: PathBuf, store: Arc<dyn StateStore>) -> Self {
        Self {
            backups_dir,
            store,
            codec: VaultCodec::new(),
            snapshots: SnapshotService,
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Seal the current state into a new file in the backups directory
    pub fn export(&self, passphrase: &Passphrase, max_backups: Option<usize>) -> Result<BackupMetadata> {
        let metadata = self.write_new(BACKUP_PREFIX, passphrase)?;

        if let Some(max) = max_backups {
            self.apply_retention(max)?;
        }

        Ok(metadata)
    }

    /// Seal the current state to an explicit path (overwrites)
    pub fn export_to(&self, path: &Path, passphrase: &Passphrase) -> Result<BackupMetadata> {
        let backup = self.seal_current(passphrase)?;
        write_atomic(path, &backup)?;
        metadata_for(path)
    }

    /// List backups in the backups directory, newest first
    pub fn list(&self) -> Result<Vec<BackupMetadata>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_backup_file(&path) {
                continue;
            }
            backups.push(metadata_for(&path)?);
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// Find a backup by path, or by name within the backups directory
    pub fn resolve(&self, name_or_path: &str) -> Result<PathBuf> {
        let as_path = PathBuf::from(name_or_path);
        if as_path.is_file() {
            return Ok(as_path);
        }

        let in_dir = self.backups_dir.join(name_or_path);
        if in_dir.is_file() {
            return Ok(in_dir);
        }

        Err(Error::not_found(format!("backup {}", name_or_path)).into())
    }

    /// Load and parse a backup file without decrypting it
    pub fn read(&self, path: &Path) -> Result<EncryptedBackup> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read backup {}", path.display()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| VaultError::malformed("backup file is not UTF-8 text"))?;
        Ok(EncryptedBackup::parse(&text)?)
    }

    /// Describe a backup without the passphrase
    pub fn inspect(&self, path: &Path) -> Result<BackupInfo> {
        let backup = self.read(path)?;
        Ok(BackupInfo::from_backup(&backup)?)
    }

    /// Check that a backup decrypts with the passphrase; nothing is written
    pub fn verify(&self, path: &Path, passphrase: &Passphrase) -> Result<VerifyResult> {
        let backup = self.read(path)?;
        let info = BackupInfo::from_backup(&backup)?;
        let snapshot = self.codec.open(&backup, passphrase)?;
        Ok(VerifyResult {
            info,
            entries: snapshot.entry_count(),
        })
    }

    /// Decrypt a parsed backup
    pub fn open(&self, backup: &EncryptedBackup, passphrase: &Passphrase) -> Result<Snapshot> {
        Ok(self.codec.open(backup, passphrase)?)
    }

    /// Restore the state store from a backup file
    pub fn restore(&self, path: &Path, passphrase: &Passphrase, safety_backup: bool) -> Result<RestoreResult> {
        let backup = self.read(path)?;
        let snapshot = self.open(&backup, passphrase)?;
        self.restore_snapshot(&snapshot, passphrase, safety_backup)
    }

    /// Replace the state store with an already decrypted snapshot.
    ///
    /// With `safety_backup` set, the current state is sealed under the same
    /// passphrase first; if that fails the store is left untouched.
    pub fn restore_snapshot(
        &self,
        snapshot: &Snapshot,
        passphrase: &Passphrase,
        safety_backup: bool,
    ) -> Result<RestoreResult> {
        let safety = if safety_backup && !self.store.is_empty()? {
            Some(
                self.write_new(PRE_RESTORE_PREFIX, passphrase)
                    .context("Failed to create pre-restore backup")?,
            )
        } else {
            None
        };

        let applied = self.snapshots.apply(self.store.as_ref(), snapshot)?;

        Ok(RestoreResult {
            keys_restored: applied.keys_restored,
            keys_removed: applied.keys_removed,
            safety_backup: safety,
        })
    }

    /// Delete every backup in the backups directory
    pub fn clear(&self) -> Result<ClearResult> {
        let backups = self.list()?;
        for backup in &backups {
            fs::remove_file(&backup.path)?;
        }
        Ok(ClearResult {
            deleted: backups.len(),
        })
    }

    /// Delete the oldest backups beyond `max_backups`; returns how many went
    pub fn apply_retention(&self, max_backups: usize) -> Result<usize> {
        let mut backups = self.list()?;
        let mut deleted = 0;

        while backups.len() > max_backups {
            if let Some(oldest) = backups.pop() {
                fs::remove_file(&oldest.path)?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    fn seal_current(&self, passphrase: &Passphrase) -> Result<EncryptedBackup> {
        let snapshot = self.snapshots.collect(self.store.as_ref())?;
        Ok(self.codec.seal(&snapshot, passphrase)?)
    }

    fn write_new(&self, prefix: &str, passphrase: &Passphrase) -> Result<BackupMetadata> {
        fs::create_dir_all(&self.backups_dir).context("Failed to create backups directory")?;

        let backup = self.seal_current(passphrase)?;

        let now = Utc::now();
        let backup_name = format!(
            "{}{}-{:06}.{}",
            prefix,
            now.format("%Y-%m-%dT%H-%M-%S"),
            now.timestamp_subsec_micros(),
            BACKUP_EXTENSION
        );
        let path = self.backups_dir.join(&backup_name);
        write_atomic(&path, &backup)?;

        metadata_for(&path)
    }
}

/// Write through a temp file in the target directory so readers never see
/// a half-written backup
fn write_atomic(path: &Path, backup: &EncryptedBackup) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let json = backup.to_json()?;
    let mut tmp = NamedTempFile::new_in(dir).context("Failed to create backup file")?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write backup {}", path.display()))?;
    Ok(())
}

fn is_backup_file(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str());
    if ext != Some(BACKUP_EXTENSION) && ext != Some(LEGACY_EXTENSION) {
        return false;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(BACKUP_PREFIX))
}

fn metadata_for(path: &Path) -> Result<BackupMetadata> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let fs_meta = fs::metadata(path)?;

    let created_at = parse_backup_time(&name)
        .or_else(|| fs_meta.modified().ok().map(DateTime::<Utc>::from))
        .unwrap_or_else(Utc::now);

    Ok(BackupMetadata {
        pre_restore: name.starts_with(PRE_RESTORE_PREFIX),
        name,
        path: path.to_path_buf(),
        created_at,
        size_bytes: fs_meta.len(),
    })
}

/// Parse creation time from a backup filename
fn parse_backup_time(backup_name: &str) -> Option<DateTime<Utc>> {
    // "lifeos-[pre-restore-]TIMESTAMP.vaultbackup"
    let ts = backup_name
        .strip_prefix(PRE_RESTORE_PREFIX)
        .or_else(|| backup_name.strip_prefix(BACKUP_PREFIX))?;
    let (ts, _) = ts.rsplit_once('.')?;

    // Try with microseconds first, then without
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S-%6f")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S"))
        .map(|dt| dt.and_utc())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    fn passphrase(s: &str) -> Passphrase {
        Passphrase::new(s).unwrap()
    }

    fn service(dir: &TempDir, store: Arc<MemoryStateStore>) -> BackupService {
        BackupService::new(dir.path().join("backups"), store)
    }

    fn seeded_store() -> Arc<MemoryStateStore> {
        Arc::new(MemoryStateStore::with_entries([
            ("goals", r#"[{"id":"g1","progress":42}]"#),
            ("theme", "dark"),
        ]))
    }

    #[test]
    fn test_parse_backup_time() {
        let ts = parse_backup_time("lifeos-2025-01-15T10-30-00-000123.vaultbackup").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2025, 1, 15));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (10, 30, 0));
        assert_eq!(ts.timestamp_subsec_micros(), 123);

        assert!(parse_backup_time("lifeos-pre-restore-2025-01-15T10-30-00.vaultbackup").is_some());
        assert!(parse_backup_time("lifeos-export.json").is_none());
        assert!(parse_backup_time("notes.vaultbackup").is_none());
    }

    #[test]
    fn test_export_then_list() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, seeded_store());

        let first = svc.export(&passphrase("pw"), None).unwrap();
        let second = svc.export(&passphrase("pw"), None).unwrap();
        assert!(first.name.starts_with("lifeos-"));
        assert!(first.name.ends_with(".vaultbackup"));
        assert!(!first.pre_restore);
        assert!(first.size_bytes > 0);

        // Unrelated files are ignored
        fs::write(svc.backups_dir().join("notes.txt"), "x").unwrap();

        let listed = svc.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, second.name);
        assert_eq!(listed[1].name, first.name);
    }

    #[test]
    fn test_export_applies_retention() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, seeded_store());

        for _ in 0..3 {
            svc.export(&passphrase("pw"), Some(2)).unwrap();
        }
        assert_eq!(svc.list().unwrap().len(), 2);
        assert_eq!(svc.apply_retention(0).unwrap(), 2);
        assert!(svc.list().unwrap().is_empty());
    }

    #[test]
    fn test_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = seeded_store();
        let backup = service(&dir, Arc::clone(&source))
            .export(&passphrase("pw"), None)
            .unwrap();

        let target = Arc::new(MemoryStateStore::with_entries([("stale", "1")]));
        let svc = service(&dir, Arc::clone(&target));
        let result = svc.restore(&backup.path, &passphrase("pw"), false).unwrap();

        assert_eq!(result.keys_restored, 2);
        assert_eq!(result.keys_removed, 1);
        assert!(result.safety_backup.is_none());
        assert_eq!(target.entries().unwrap(), source.entries().unwrap());
    }

    #[test]
    fn test_wrong_passphrase_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let backup = service(&dir, seeded_store())
            .export(&passphrase("right"), None)
            .unwrap();

        let target = Arc::new(MemoryStateStore::with_entries([("mine", "keep")]));
        let svc = service(&dir, Arc::clone(&target));
        let err = svc.restore(&backup.path, &passphrase("wrong"), true).unwrap_err();

        assert_eq!(err.downcast_ref::<VaultError>(), Some(&VaultError::DecryptError));
        assert_eq!(target.get("mine").unwrap().as_deref(), Some("keep"));
        // No safety backup is taken when decryption fails
        assert_eq!(svc.list().unwrap().len(), 1);
    }

    #[test]
    fn test_restore_takes_safety_backup() {
        let dir = TempDir::new().unwrap();
        let backup = service(&dir, seeded_store())
            .export(&passphrase("pw"), None)
            .unwrap();

        let target = Arc::new(MemoryStateStore::with_entries([("journal", r#"["day one"]"#)]));
        let svc = service(&dir, Arc::clone(&target));
        let result = svc.restore(&backup.path, &passphrase("pw"), true).unwrap();

        let safety = result.safety_backup.unwrap();
        assert!(safety.pre_restore);
        assert!(safety.name.starts_with("lifeos-pre-restore-"));

        // The safety copy brings back what the restore replaced
        svc.restore(&safety.path, &passphrase("pw"), false).unwrap();
        assert_eq!(target.get("journal").unwrap().as_deref(), Some(r#"["day one"]"#));
        assert_eq!(target.get("goals").unwrap(), None);
    }

    #[test]
    fn test_read_reports_malformed_files() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, seeded_store());

        let garbage = dir.path().join("garbage.vaultbackup");
        fs::write(&garbage, [0xff, 0xfe, 0x00]).unwrap();
        let err = svc.read(&garbage).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::MalformedBackup { .. })
        ));

        let future = dir.path().join("future.vaultbackup");
        fs::write(&future, r#"{"version": 2}"#).unwrap();
        let err = svc.inspect(&future).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_inspect_and_verify() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, seeded_store());
        let path = dir.path().join("out").join("manual.vaultbackup");
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        svc.export_to(&path, &passphrase("pw")).unwrap();

        let info = svc.inspect(&path).unwrap();
        assert_eq!(info.version, 1);
        assert_eq!(info.ciphertext_bytes, info.payload_bytes + 16);

        let verified = svc.verify(&path, &passphrase("pw")).unwrap();
        assert_eq!(verified.entries, 2);
        assert!(svc.verify(&path, &passphrase("nope")).is_err());
    }

    #[test]
    fn test_resolve_and_clear() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, seeded_store());
        let backup = svc.export(&passphrase("pw"), None).unwrap();

        assert_eq!(svc.resolve(&backup.name).unwrap(), backup.path);
        assert_eq!(
            svc.resolve(backup.path.to_str().unwrap()).unwrap(),
            backup.path
        );
        let err = svc.resolve("lifeos-missing.vaultbackup").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
        assert_eq!(err.to_string(), "Not found: backup lifeos-missing.vaultbackup");

        assert_eq!(svc.clear().unwrap().deleted, 1);
        assert!(svc.list().unwrap().is_empty());
    }
}
