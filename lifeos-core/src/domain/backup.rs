//! Backup domain models
//!
//! `EncryptedBackup` is the wire format: a JSON document with exactly four
//! fields. Binary fields use standard base64 with padding.
//! `BackupMetadata` and `BackupInfo` describe backup files on disk.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::encryption::{FORMAT_DESCRIPTION, FORMAT_VERSION, IV_LEN, SALT_LEN, TAG_LEN};
use super::result::VaultError;

/// A sealed snapshot, self-contained apart from the passphrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedBackup {
    /// Base64 ciphertext with the authentication tag appended
    pub data: String,
    /// Base64 AES-GCM nonce
    pub iv: String,
    /// Base64 key-derivation salt
    pub salt: String,
    pub version: u32,
}

/// Raw bytes of a backup whose encoding and field lengths check out
#[derive(Debug)]
pub(crate) struct DecodedBackup {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub data: Vec<u8>,
}

impl EncryptedBackup {
    /// Package freshly sealed parts at the current format version
    pub(crate) fn from_parts(salt: &[u8; SALT_LEN], iv: &[u8; IV_LEN], data: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(data),
            iv: STANDARD.encode(iv),
            salt: STANDARD.encode(salt),
            version: FORMAT_VERSION,
        }
    }

    /// Parse a persisted backup document.
    ///
    /// The version is checked before anything else, so a file written by a
    /// newer format reports `UnsupportedVersion` even if its other fields
    /// look nothing like version 1.
    pub fn parse(text: &str) -> Result<Self, VaultError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| VaultError::malformed(format!("not a JSON document: {}", e)))?;

        let Some(object) = value.as_object() else {
            return Err(VaultError::malformed("backup must be a JSON object"));
        };

        match object.get("version") {
            Some(Value::Number(n)) if n.is_f64() => {
                return Err(VaultError::malformed("version must be an integer"));
            }
            Some(Value::Number(n)) if n.as_u64() != Some(u64::from(FORMAT_VERSION)) => {
                return Err(VaultError::UnsupportedVersion(n.clone()));
            }
            Some(Value::Number(_)) => {}
            Some(_) => return Err(VaultError::malformed("version must be an integer")),
            None => return Err(VaultError::malformed("missing version field")),
        }

        serde_json::from_value(value)
            .map_err(|e| VaultError::malformed(format!("invalid backup fields: {}", e)))
    }

    /// Serialize to the pretty-printed file form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Decode the base64 fields and check their lengths
    pub(crate) fn decode(&self) -> Result<DecodedBackup, VaultError> {
        let salt = decode_exact::<SALT_LEN>("salt", &self.salt)?;
        let iv = decode_exact::<IV_LEN>("iv", &self.iv)?;
        let data = decode_field("data", &self.data)?;
        if data.len() < TAG_LEN {
            return Err(VaultError::malformed(format!(
                "data is {} bytes, shorter than the {}-byte authentication tag",
                data.len(),
                TAG_LEN
            )));
        }
        Ok(DecodedBackup { salt, iv, data })
    }
}

fn decode_field(field: &str, encoded: &str) -> Result<Vec<u8>, VaultError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|_| VaultError::malformed(format!("{} is not valid base64", field)))
}

fn decode_exact<const N: usize>(field: &str, encoded: &str) -> Result<[u8; N], VaultError> {
    let bytes = decode_field(field, encoded)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        VaultError::malformed(format!("{} must decode to {} bytes, got {}", field, N, len))
    })
}

/// Metadata for a backup file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Backup filename (e.g., "lifeos-2025-01-15T10-30-00-000123.vaultbackup")
    pub name: String,
    pub path: PathBuf,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// File size in bytes
    pub size_bytes: u64,
    /// Automatic safety copy taken before a restore
    pub pre_restore: bool,
}

impl BackupMetadata {
    /// Format size for human display
    pub fn size_display(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size_bytes >= GB {
            format!("{:.1} GB", self.size_bytes as f64 / GB as f64)
        } else if self.size_bytes >= MB {
            format!("{:.1} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.1} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size_bytes)
        }
    }
}

/// What can be learned about a backup without the passphrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub version: u32,
    pub format: String,
    /// Ciphertext length including the tag
    pub ciphertext_bytes: usize,
    /// Serialized snapshot length (ciphertext minus tag)
    pub payload_bytes: usize,
}

impl BackupInfo {
    pub fn from_backup(backup: &EncryptedBackup) -> Result<Self, VaultError> {
        if backup.version != FORMAT_VERSION {
            return Err(VaultError::UnsupportedVersion(backup.version.into()));
        }
        let decoded = backup.decode()?;
        Ok(Self {
            version: backup.version,
            format: FORMAT_DESCRIPTION.to_string(),
            ciphertext_bytes: decoded.data.len(),
            payload_bytes: decoded.data.len() - TAG_LEN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedBackup {
        EncryptedBackup::from_parts(&[7u8; SALT_LEN], &[9u8; IV_LEN], &[1u8; TAG_LEN + 4])
    }

    #[test]
    fn test_file_form_has_exactly_four_fields() {
        let json: Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert_eq!(object["version"], 1);
        assert_eq!(object["iv"], "CQkJCQkJCQkJCQkJ");
    }

    #[test]
    fn test_parse_accepts_own_output() {
        let backup = sample();
        let parsed = EncryptedBackup::parse(&backup.to_json().unwrap()).unwrap();
        assert_eq!(parsed, backup);
    }

    #[test]
    fn test_parse_checks_version_before_shape() {
        let err = EncryptedBackup::parse(r#"{"version": 2, "payload": "x"}"#).unwrap_err();
        assert_eq!(err, VaultError::UnsupportedVersion(2u32.into()));

        let err = EncryptedBackup::parse(r#"{"version": -1}"#).unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_documents() {
        let cases = [
            "not json",
            "[1, 2, 3]",
            r#"{"data": "", "iv": "", "salt": ""}"#,
            r#"{"data": "", "iv": "", "salt": "", "version": "1"}"#,
            r#"{"data": "", "iv": "", "salt": "", "version": 1.0}"#,
            r#"{"iv": "", "salt": "", "version": 1}"#,
            r#"{"data": "", "iv": "", "salt": "", "version": 1, "extra": true}"#,
        ];
        for case in cases {
            let err = EncryptedBackup::parse(case).unwrap_err();
            assert!(
                matches!(err, VaultError::MalformedBackup { .. }),
                "expected malformed for {}: {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_decode_checks_lengths() {
        let mut backup = sample();
        backup.iv = STANDARD.encode([0u8; IV_LEN - 1]);
        let err = backup.decode().unwrap_err();
        assert_eq!(err.reason(), Some("iv must decode to 12 bytes, got 11"));

        let mut backup = sample();
        backup.salt = STANDARD.encode([0u8; SALT_LEN + 1]);
        assert!(backup.decode().is_err());

        let mut backup = sample();
        backup.data = STANDARD.encode([0u8; TAG_LEN - 1]);
        assert!(backup.decode().is_err());

        let mut backup = sample();
        backup.salt = "!!not-base64!!".to_string();
        assert_eq!(backup.decode().unwrap_err().reason(), Some("salt is not valid base64"));
    }

    #[test]
    fn test_backup_info() {
        let info = BackupInfo::from_backup(&sample()).unwrap();
        assert_eq!(info.ciphertext_bytes, TAG_LEN + 4);
        assert_eq!(info.payload_bytes, 4);
        assert_eq!(info.format, FORMAT_DESCRIPTION);
    }

    #[test]
    fn test_size_display() {
        let meta = BackupMetadata {
            name: "lifeos-test.vaultbackup".to_string(),
            path: PathBuf::from("lifeos-test.vaultbackup"),
            created_at: Utc::now(),
            size_bytes: 1536,
            pre_restore: false,
        };
        assert_eq!(meta.size_display(), "1.5 KB");
    }
}
