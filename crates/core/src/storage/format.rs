use super::encryption::KdfParams;
use crate::errors::CoreError;

/// Magic bytes of a sealed credential vault.
pub const MAGIC: &[u8; 4] = b"FTCV";

pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2) + kdf params(12) + salt(16) + nonce(12) + ciphertext_len(8)
pub const HEADER_SIZE: usize = 54;

/// Parsed vault header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
}

/// Serialize a vault.
///
/// ```text
/// [FTCV: 4B] [version: 2B LE] [memory_cost: 4B LE] [time_cost: 4B LE]
/// [parallelism: 4B LE] [salt: 16B] [nonce: 12B] [ciphertext_len: 8B LE]
/// [ciphertext: variable]
/// ```
pub fn encode_vault(header: &VaultHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// `true` if the bytes start with the vault magic.
#[must_use]
pub fn is_vault(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Parse a vault into its header and ciphertext.
///
/// KDF parameters are range-checked so a crafted file cannot make key
/// derivation allocate unbounded memory.
pub fn decode_vault(data: &[u8]) -> Result<(VaultHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "file too small to be a credential vault".into(),
        ));
    }
    if !is_vault(data) {
        return Err(CoreError::InvalidFileFormat(
            "invalid magic bytes — not a credential vault".into(),
        ));
    }

    let mut reader = Reader { data, offset: MAGIC.len() };

    let version = u16::from_le_bytes(reader.take::<2>()?);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf_params = KdfParams {
        memory_cost: u32::from_le_bytes(reader.take::<4>()?),
        time_cost: u32::from_le_bytes(reader.take::<4>()?),
        parallelism: u32::from_le_bytes(reader.take::<4>()?),
    };
    check_kdf_params(&kdf_params)?;

    let salt = reader.take::<16>()?;
    let nonce = reader.take::<12>()?;
    let ciphertext_len = u64::from_le_bytes(reader.take::<8>()?);

    let remaining = data.len() - reader.offset;
    let len = usize::try_from(ciphertext_len)
        .ok()
        .filter(|len| *len <= remaining)
        .ok_or_else(|| {
            CoreError::InvalidFileFormat(format!(
                "vault truncated: header announces {ciphertext_len} bytes, {remaining} present"
            ))
        })?;

    let ciphertext = &data[reader.offset..reader.offset + len];
    Ok((
        VaultHeader {
            version,
            kdf_params,
            salt,
            nonce,
        },
        ciphertext,
    ))
}

fn check_kdf_params(params: &KdfParams) -> Result<(), CoreError> {
    if !(8..=1_048_576).contains(&params.memory_cost) {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF memory_cost out of range: {} KiB (expected 8..=1048576)",
            params.memory_cost
        )));
    }
    if !(1..=20).contains(&params.time_cost) {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF time_cost out of range: {} (expected 1..=20)",
            params.time_cost
        )));
    }
    if !(1..=16).contains(&params.parallelism) {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF parallelism out of range: {} (expected 1..=16)",
            params.parallelism
        )));
    }
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let bytes: [u8; N] = self
            .data
            .get(self.offset..self.offset + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| CoreError::InvalidFileFormat("vault header truncated".into()))?;
        self.offset += N;
        Ok(bytes)
    }
}
