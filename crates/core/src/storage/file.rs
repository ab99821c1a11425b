use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::encryption::{KdfParams, SealingKey};
use super::format::{self, VaultHeader};
use super::traits::{CredentialStorage, Slot};
use crate::errors::CoreError;

/// Slot storage persisted to a single file.
///
/// Plain mode writes a JSON object keyed by slot name. Sealed mode writes an
/// `FTCV` vault: the bincode-encoded slot map under AES-256-GCM with an
/// Argon2id key. Every change rewrites the whole file through a temporary
/// file and a rename, so a crash never leaves half a credential pair behind.
pub struct FileStorage {
    path: PathBuf,
    sealing: Option<SealingKey>,
    slots: BTreeMap<String, String>,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .field("sealed", &self.sealing.is_some())
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FileStorage {
    /// Open (or prepare to create) a plain JSON credential file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        let slots = match read_optional(&path)? {
            None => BTreeMap::new(),
            Some(bytes) if format::is_vault(&bytes) => {
                return Err(CoreError::InvalidFileFormat(format!(
                    "{} is a sealed vault; a passphrase is required",
                    path.display()
                )))
            }
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Some(bytes) => serde_json::from_slice(&bytes)?,
        };
        Ok(Self {
            path,
            sealing: None,
            slots,
        })
    }

    /// Open (or prepare to create) a sealed vault.
    pub fn open_sealed(path: impl AsRef<Path>, passphrase: &str) -> Result<Self, CoreError> {
        Self::open_sealed_with(path, passphrase, KdfParams::default())
    }

    /// Like [`FileStorage::open_sealed`], with explicit KDF parameters for
    /// new vaults. Existing vaults keep the parameters in their header.
    pub fn open_sealed_with(
        path: impl AsRef<Path>,
        passphrase: &str,
        params: KdfParams,
    ) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        let (sealing, slots) = match read_optional(&path)? {
            None => (SealingKey::generate(passphrase, params)?, BTreeMap::new()),
            Some(bytes) => {
                let (header, ciphertext) = format::decode_vault(&bytes)?;
                let key = SealingKey::derive(passphrase, header.salt, header.kdf_params)?;
                let plaintext = key.open(&header.nonce, ciphertext)?;
                let slots = bincode::deserialize(&plaintext).map_err(|e| {
                    CoreError::Deserialization(format!("Failed to decode credential vault: {e}"))
                })?;
                (key, slots)
            }
        };
        Ok(Self {
            path,
            sealing: Some(sealing),
            slots,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealing.is_some()
    }

    fn encode(&self) -> Result<Vec<u8>, CoreError> {
        match &self.sealing {
            None => Ok(serde_json::to_vec_pretty(&self.slots)?),
            Some(key) => {
                let plaintext = bincode::serialize(&self.slots)?;
                let (nonce, ciphertext) = key.seal(&plaintext)?;
                let header = VaultHeader {
                    version: format::CURRENT_VERSION,
                    kdf_params: key.params,
                    salt: key.salt,
                    nonce,
                };
                Ok(format::encode_vault(&header, &ciphertext))
            }
        }
    }

    fn persist(&self) -> Result<(), CoreError> {
        let bytes = self.encode()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply a change, persist it, and restore the previous map if the
    /// write fails so memory never runs ahead of disk.
    fn update(&mut self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), CoreError> {
        let previous = self.slots.clone();
        change(&mut self.slots);
        if previous == self.slots {
            return Ok(());
        }
        if let Err(e) = self.persist() {
            self.slots = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl CredentialStorage for FileStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>, CoreError> {
        Ok(self.slots.get(slot.key()).cloned())
    }

    fn write(&mut self, slot: Slot, value: &str) -> Result<(), CoreError> {
        self.update(|slots| {
            slots.insert(slot.key().to_string(), value.to_string());
        })
    }

    fn remove(&mut self, slot: Slot) -> Result<(), CoreError> {
        self.update(|slots| {
            slots.remove(slot.key());
        })
    }

    fn write_all(&mut self, entries: &[(Slot, &str)]) -> Result<(), CoreError> {
        self.update(|slots| {
            for (slot, value) in entries {
                slots.insert(slot.key().to_string(), (*value).to_string());
            }
        })
    }

    fn clear(&mut self) -> Result<(), CoreError> {
        self.update(|slots| {
            for slot in Slot::ALL {
                slots.remove(slot.key());
            }
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
