use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::traits::{CredentialStorage, Slot};
use crate::errors::CoreError;

/// In-process slot storage.
///
/// Clones share the same slots, so a second store opened over a clone sees
/// what the first one persisted (the same way a reload sees browser storage).
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<Slot, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage, mostly for tests.
    pub fn with_slots(entries: &[(Slot, &str)]) -> Self {
        let storage = Self::new();
        {
            let mut slots = storage.slots.lock().unwrap_or_else(PoisonError::into_inner);
            for (slot, value) in entries {
                slots.insert(*slot, (*value).to_string());
            }
        }
        storage
    }

    /// Current value of a slot, bypassing the trait.
    #[must_use]
    pub fn peek(&self, slot: Slot) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl CredentialStorage for MemoryStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>, CoreError> {
        Ok(self.peek(slot))
    }

    fn write(&mut self, slot: Slot, value: &str) -> Result<(), CoreError> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> Result<(), CoreError> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&slot);
        Ok(())
    }
}
