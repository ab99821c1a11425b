use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CoreError;

/// Argon2id parameters, stored in the vault header so a file stays readable
/// if the defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// Argon2id m=19 MiB, t=2, p=1. The vault is re-opened on every start,
    /// so this stays well below a second.
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// A derived AES-256 key together with the salt and parameters it came from.
///
/// Deriving is the expensive part; the key is derived once per open and then
/// reused for every write with a fresh nonce.
#[derive(Clone)]
pub struct SealingKey {
    key: [u8; 32],
    pub salt: [u8; 16],
    pub params: KdfParams,
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealingKey")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl SealingKey {
    /// Derive a key for a new vault (fresh random salt).
    pub fn generate(passphrase: &str, params: KdfParams) -> Result<Self, CoreError> {
        let salt = random_bytes::<16>()?;
        Self::derive(passphrase, salt, params)
    }

    /// Re-derive the key of an existing vault.
    pub fn derive(passphrase: &str, salt: [u8; 16], params: KdfParams) -> Result<Self, CoreError> {
        let argon2_params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(32),
        )
        .map_err(|e| CoreError::Encryption(format!("Invalid Argon2 params: {e}")))?;

        let mut key = [0u8; 32];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params)
            .hash_password_into(passphrase.as_bytes(), &salt, &mut key)
            .map_err(|e| CoreError::Encryption(format!("Argon2 key derivation failed: {e}")))?;

        Ok(Self { key, salt, params })
    }

    /// AES-256-GCM encrypt under a fresh nonce. The ciphertext carries the
    /// 16-byte authentication tag.
    pub fn seal(&self, plaintext: &[u8]) -> Result<([u8; 12], Vec<u8>), CoreError> {
        let nonce = random_bytes::<12>()?;
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CoreError::Encryption(format!("Encryption failed: {e}")))?;
        Ok((nonce, ciphertext))
    }

    /// Decrypt and verify. A wrong passphrase or tampered file both surface
    /// as `CoreError::Decryption`.
    pub fn open(&self, nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, CoreError> {
        Ok(self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)?)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CoreError> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))
    }
}

fn random_bytes<const N: usize>() -> Result<[u8; N], CoreError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf)
        .map_err(|e| CoreError::Encryption(format!("Failed to gather randomness: {e}")))?;
    Ok(buf)
}
