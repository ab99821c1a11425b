use crate::errors::CoreError;

/// The three independently removable slots of durable session state.
/// A missing slot is a valid state meaning "signed out".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    AccessToken,
    RefreshToken,
    /// JSON-serialized `Identity`.
    User,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::AccessToken, Slot::RefreshToken, Slot::User];

    /// Stable key used on disk.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Slot::AccessToken => "access_token",
            Slot::RefreshToken => "refresh_token",
            Slot::User => "user",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.key() == key)
    }
}

/// Durable backing for the credential store.
///
/// Only the credential store talks to this trait; no other component reads
/// or writes the slots directly.
pub trait CredentialStorage: Send {
    fn read(&self, slot: Slot) -> Result<Option<String>, CoreError>;

    fn write(&mut self, slot: Slot, value: &str) -> Result<(), CoreError>;

    fn remove(&mut self, slot: Slot) -> Result<(), CoreError>;

    /// Write several slots. Backends that can persist them in one step
    /// should override this.
    fn write_all(&mut self, entries: &[(Slot, &str)]) -> Result<(), CoreError> {
        for (slot, value) in entries {
            self.write(*slot, value)?;
        }
        Ok(())
    }

    /// Remove every slot, attempting all of them even if one fails.
    /// Returns the first error encountered.
    fn clear(&mut self) -> Result<(), CoreError> {
        let mut first_error = None;
        for slot in Slot::ALL {
            if let Err(e) = self.remove(slot) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
