//! Key derivation - stretches a passphrase into an AES-256 key
//!
//! PBKDF2-HMAC-SHA256 with a fixed round count. The round count is part of
//! the backup format, so it is not configurable: a backup can only be
//! opened with the exact work factor that sealed it.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::domain::encryption::{KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN};
use crate::domain::Passphrase;

/// Stateless passphrase-to-key stretcher
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDeriver;

impl KeyDeriver {
    /// Derive the backup key for `passphrase` and `salt`.
    ///
    /// Deliberately slow (hundreds of milliseconds). The same inputs always
    /// give the same key; a wrong passphrase is only detectable by trying
    /// to decrypt with the result. The key is wiped when dropped.
    pub fn derive(&self, passphrase: &Passphrase, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
        debug_assert!(!passphrase.expose().is_empty(), "empty passphrase reached key derivation");

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(
            passphrase.expose().as_bytes(),
            salt,
            PBKDF2_ITERATIONS,
            &mut key[..],
        );
        key
    }
}
