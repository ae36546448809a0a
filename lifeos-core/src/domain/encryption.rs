//! Encryption domain models
//!
//! Version 1 of the backup format is PBKDF2-HMAC-SHA256 key derivation
//! followed by AES-256-GCM, the same construction browser Web Crypto
//! exports use. Every constant below is part of that format.

use std::fmt;

use zeroize::Zeroizing;

use super::result::{Error, Result};

/// Backup container format version written by this build
pub const FORMAT_VERSION: u32 = 1;
/// Random salt length for key derivation
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length (96 bits)
pub const IV_LEN: usize = 12;
/// Derived key length (AES-256)
pub const KEY_LEN: usize = 32;
/// AES-GCM authentication tag length, appended to the ciphertext
pub const TAG_LEN: usize = 16;
/// PBKDF2 rounds for format version 1
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// File extension for exported backups
pub const BACKUP_EXTENSION: &str = "vaultbackup";
/// Human-readable description of the version 1 construction
pub const FORMAT_DESCRIPTION: &str = "pbkdf2-sha256/aes-256-gcm v1";

/// A user passphrase held in memory that is wiped on drop.
///
/// Empty passphrases are rejected at construction, so nothing downstream
/// ever derives a key from one.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(passphrase: impl Into<String>) -> Result<Self> {
        let passphrase = Zeroizing::new(passphrase.into());
        if passphrase.is_empty() {
            return Err(Error::validation("Passphrase must not be empty"));
        }
        Ok(Self(passphrase))
    }

    /// Borrow the raw passphrase for key derivation
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}
