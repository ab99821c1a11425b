use crate::errors::CoreError;
use crate::models::identity::{CredentialPair, Identity};
use crate::storage::{CredentialStorage, Slot};

/// In-memory view of the session credentials, backed by durable slots.
///
/// Invariant: the pair is either fully present or fully absent, both in
/// memory and (after any successful write) in storage. Only the session
/// manager mutates a store; everyone else gets read access through it.
pub struct CredentialStore {
    storage: Box<dyn CredentialStorage>,
    pair: Option<CredentialPair>,
    identity: Option<Identity>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.pair.is_some())
            .field("identity", &self.identity)
            .finish()
    }
}

impl CredentialStore {
    /// Read durable storage once and build the in-memory state.
    ///
    /// A half-present pair is discarded and its slots cleared; an identity
    /// slot that does not parse is removed and treated as absent. Storage
    /// read errors leave the store signed out.
    pub fn open(storage: Box<dyn CredentialStorage>) -> Self {
        let mut store = Self {
            storage,
            pair: None,
            identity: None,
        };

        let access = store.read_slot(Slot::AccessToken);
        let refresh = store.read_slot(Slot::RefreshToken);

        match (access, refresh) {
            (Some(access), Some(refresh)) => {
                store.pair = Some(CredentialPair { access, refresh });
            }
            (None, None) => {}
            _ => {
                tracing::warn!("discarding partially stored credential pair");
                if let Err(e) = store.storage.clear() {
                    tracing::warn!(error = %e, "failed to clear partial credentials");
                }
                return store;
            }
        }

        if let Some(raw) = store.read_slot(Slot::User) {
            match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => store.identity = Some(identity),
                Err(e) => {
                    tracing::warn!(error = %e, "stored identity is unreadable; removing it");
                    if let Err(e) = store.storage.remove(Slot::User) {
                        tracing::warn!(error = %e, "failed to remove identity slot");
                    }
                }
            }
        }

        store
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.pair.is_some()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.pair.as_ref().map(|p| p.access.as_str())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.pair.as_ref().map(|p| p.refresh.as_str())
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Store a fresh pair and identity after sign-in / sign-up.
    ///
    /// All three slots are written together. On failure the in-memory state
    /// is left untouched and storage is put back the way it was: the
    /// previous session is rewritten, or the slots are cleared if there was
    /// none.
    pub(crate) fn establish(
        &mut self,
        pair: CredentialPair,
        identity: Identity,
    ) -> Result<(), CoreError> {
        let user = serde_json::to_string(&identity)
            .map_err(|e| CoreError::Serialization(format!("Failed to encode identity: {e}")))?;

        let entries = [
            (Slot::AccessToken, pair.access.as_str()),
            (Slot::RefreshToken, pair.refresh.as_str()),
            (Slot::User, user.as_str()),
        ];
        if let Err(e) = self.storage.write_all(&entries) {
            if let Err(rollback) = self.restore() {
                tracing::warn!(error = %rollback, "failed to roll back partial credential write");
            }
            return Err(e);
        }

        self.pair = Some(pair);
        self.identity = Some(identity);
        Ok(())
    }

    /// Swap in tokens renewed with the refresh credential `presented`.
    /// `refresh` is `None` unless the provider rotated it.
    ///
    /// Returns `false` and changes nothing when the stored refresh
    /// credential is no longer `presented`: the session ended, or a new
    /// one was established while the renewal was in flight.
    ///
    /// Memory is always updated; a durable write failure only means the
    /// next start reads the previous, still complete, pair.
    pub(crate) fn replace_tokens(
        &mut self,
        presented: &str,
        access: String,
        refresh: Option<String>,
    ) -> bool {
        let Some(pair) = self.pair.as_mut().filter(|p| p.refresh == presented) else {
            return false;
        };
        pair.access = access;
        if let Some(refresh) = refresh {
            pair.refresh = refresh;
        }

        let entries = [
            (Slot::AccessToken, pair.access.as_str()),
            (Slot::RefreshToken, pair.refresh.as_str()),
        ];
        if let Err(e) = self.storage.write_all(&entries) {
            tracing::warn!(error = %e, "failed to persist renewed credentials");
        }
        true
    }

    /// Forget everything, in memory and in storage.
    pub(crate) fn teardown(&mut self) {
        self.pair = None;
        self.identity = None;
        if let Err(e) = self.storage.clear() {
            tracing::warn!(error = %e, "failed to clear stored credentials");
        }
    }

    /// [`CredentialStore::teardown`], but only while the session still holds
    /// the refresh credential `presented`. Returns whether it tore down.
    pub(crate) fn teardown_if_current(&mut self, presented: &str) -> bool {
        if self.refresh_token() != Some(presented) {
            return false;
        }
        self.teardown();
        true
    }

    /// Rewrite the in-memory session to storage, or clear storage if there
    /// is none.
    fn restore(&mut self) -> Result<(), CoreError> {
        let Some(pair) = &self.pair else {
            return self.storage.clear();
        };
        self.storage.write_all(&[
            (Slot::AccessToken, pair.access.as_str()),
            (Slot::RefreshToken, pair.refresh.as_str()),
        ])?;
        match &self.identity {
            Some(identity) => {
                let user = serde_json::to_string(identity).map_err(|e| {
                    CoreError::Serialization(format!("Failed to encode identity: {e}"))
                })?;
                self.storage.write(Slot::User, &user)
            }
            None => self.storage.remove(Slot::User),
        }
    }

    fn read_slot(&self, slot: Slot) -> Option<String> {
        match self.storage.read(slot) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(slot = slot.key(), error = %e, "failed to read credential slot");
                None
            }
        }
    }
}
