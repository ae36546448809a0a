//! Vault codec - seals snapshots into encrypted backups and opens them again
//!
//! Seal: serialize, draw a fresh salt and nonce, derive the key, AES-256-GCM
//! encrypt, base64 the parts. Open runs the same steps backwards and stops
//! at the first failure; no partial snapshot ever leaves this module.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::key_deriver::KeyDeriver;
use crate::domain::encryption::{FORMAT_VERSION, IV_LEN, KEY_LEN, SALT_LEN};
use crate::domain::{EncryptedBackup, Passphrase, Snapshot, VaultError};

/// Stateless seal/open protocol for encrypted backups
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultCodec {
    key_deriver: KeyDeriver,
}

impl VaultCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt a snapshot under a passphrase.
    ///
    /// Every call draws a new salt and nonce from the OS CSPRNG, so sealing
    /// the same snapshot twice never produces the same backup.
    pub fn seal(&self, snapshot: &Snapshot, passphrase: &Passphrase) -> Result<EncryptedBackup, VaultError> {
        let plaintext = Zeroizing::new(snapshot.to_bytes());

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.try_fill_bytes(&mut salt).map_err(|_| VaultError::SealFailed)?;
        OsRng.try_fill_bytes(&mut iv).map_err(|_| VaultError::SealFailed)?;

        self.seal_bytes(&plaintext, passphrase, &salt, &iv)
    }

    fn seal_bytes(
        &self,
        plaintext: &[u8],
        passphrase: &Passphrase,
        salt: &[u8; SALT_LEN],
        iv: &[u8; IV_LEN],
    ) -> Result<EncryptedBackup, VaultError> {
        let key = self.key_deriver.derive(passphrase, salt);
        let data = cipher(&key)
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|_| VaultError::SealFailed)?;
        Ok(EncryptedBackup::from_parts(salt, iv, &data))
    }

    /// Decrypt a backup back into the snapshot it was sealed from.
    ///
    /// The version is checked first and the encoding second, so impossible
    /// inputs never pay for key derivation. A wrong passphrase and a
    /// tampered file both report `DecryptError`.
    pub fn open(&self, backup: &EncryptedBackup, passphrase: &Passphrase) -> Result<Snapshot, VaultError> {
        if backup.version != FORMAT_VERSION {
            return Err(VaultError::UnsupportedVersion(backup.version.into()));
        }

        let decoded = backup.decode()?;
        let key = self.key_deriver.derive(passphrase, &decoded.salt);
        let plaintext = decrypt_payload(&key, &decoded.iv, &decoded.data)?;

        Snapshot::from_slice(&plaintext).map_err(|e| {
            VaultError::malformed(format!("decrypted payload is not a snapshot: {}", e))
        })
    }

    /// Parse a backup document and open it
    pub fn open_str(&self, text: &str, passphrase: &Passphrase) -> Result<Snapshot, VaultError> {
        let backup = EncryptedBackup::parse(text)?;
        self.open(&backup, passphrase)
    }

    /// `seal` on the blocking thread pool, for callers on an async runtime
    pub async fn seal_async(&self, snapshot: Snapshot, passphrase: Passphrase) -> Result<EncryptedBackup, VaultError> {
        let codec = *self;
        run_blocking(move || codec.seal(&snapshot, &passphrase)).await
    }

    /// `open` on the blocking thread pool, for callers on an async runtime
    pub async fn open_async(&self, backup: EncryptedBackup, passphrase: Passphrase) -> Result<Snapshot, VaultError> {
        let codec = *self;
        run_blocking(move || codec.open(&backup, &passphrase)).await
    }
}

fn cipher(key: &[u8; KEY_LEN]) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
}

fn decrypt_payload(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    cipher(key)
        .decrypt(Nonce::from_slice(iv), data)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::DecryptError)
}

async fn run_blocking<T, F>(work: F) -> Result<T, VaultError>
where
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(VaultError::Cancelled),
    }
}
