//! Configuration management
//!
//! Shares the desktop app's settings.json format:
//! ```json
//! {
//!   "app": { "theme": "dark", ... },
//!   "backups": { "maxBackups": 10, "directory": null, "safetyBackupOnRestore": true }
//! }
//! ```
//! Fields the core does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment override for the backup retention limit
pub const MAX_BACKUPS_ENV: &str = "LIFEOS_MAX_BACKUPS";

/// Raw settings.json structure (matching the app format)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: serde_json::Value,
    #[serde(default)]
    backups: BackupSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupSettings {
    #[serde(default)]
    max_backups: Option<usize>,
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default = "default_true")]
    safety_backup_on_restore: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            max_backups: None,
            directory: None,
            safety_backup_on_restore: true,
            other: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// LifeOS configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Keep at most this many backups after each export
    pub max_backups: Option<usize>,
    /// Where exported backups go (defaults to `<lifeos_dir>/backups`)
    pub backup_dir: Option<PathBuf>,
    /// Seal the current state before a restore overwrites it
    pub safety_backup_on_restore: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_backups: None,
            backup_dir: None,
            safety_backup_on_restore: true,
        }
    }
}

impl Config {
    /// Load config from the lifeos directory
    ///
    /// A missing or unreadable settings file yields the defaults. The
    /// retention limit can be overridden with LIFEOS_MAX_BACKUPS.
    pub fn load(lifeos_dir: &Path) -> Result<Self> {
        let raw = read_settings(lifeos_dir)?;

        let max_backups = match std::env::var(MAX_BACKUPS_ENV).ok() {
            Some(value) => Some(value.trim().parse::<usize>().with_context(|| {
                format!("{} must be a non-negative integer, got {:?}", MAX_BACKUPS_ENV, value)
            })?),
            None => raw.backups.max_backups,
        };

        Ok(Self {
            max_backups,
            backup_dir: raw.backups.directory,
            safety_backup_on_restore: raw.backups.safety_backup_on_restore,
        })
    }

    /// Save config to the lifeos directory
    /// Preserves other settings that the core doesn't manage
    pub fn save(&self, lifeos_dir: &Path) -> Result<()> {
        let mut settings = read_settings(lifeos_dir)?;

        settings.backups.max_backups = self.max_backups;
        settings.backups.directory = self.backup_dir.clone();
        settings.backups.safety_backup_on_restore = self.safety_backup_on_restore;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(settings_path(lifeos_dir), content).context("Failed to write settings.json")?;
        Ok(())
    }

    /// Resolve the backups directory for a lifeos directory
    pub fn backups_dir(&self, lifeos_dir: &Path) -> PathBuf {
        match &self.backup_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => lifeos_dir.join(dir),
            None => lifeos_dir.join("backups"),
        }
    }
}

fn settings_path(lifeos_dir: &Path) -> PathBuf {
    lifeos_dir.join("settings.json")
}

fn read_settings(lifeos_dir: &Path) -> Result<SettingsFile> {
    let path = settings_path(lifeos_dir);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path).context("Failed to read settings.json")?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.safety_backup_on_restore);
        assert!(config.backup_dir.is_none());
        assert_eq!(config.backups_dir(dir.path()), dir.path().join("backups"));
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.safety_backup_on_restore);
    }

    #[test]
    fn test_save_preserves_unmanaged_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"theme": "dark"}, "agents": {"lifeGps": true}, "backups": {"cloudHint": "off"}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.backup_dir = Some(PathBuf::from("vault"));
        config.safety_backup_on_restore = false;
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["agents"]["lifeGps"], true);
        assert_eq!(saved["backups"]["cloudHint"], "off");
        assert_eq!(saved["backups"]["directory"], "vault");
        assert_eq!(saved["backups"]["safetyBackupOnRestore"], false);

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.backups_dir(dir.path()), dir.path().join("vault"));
        assert!(!reloaded.safety_backup_on_restore);
    }
}
