use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use keyring::Entry;
use tracing::debug;

use super::{Storage, StorageError};

/// Default keychain service name
pub const DEFAULT_SERVICE: &str = "videoshare";

/// Storage area backed by the OS keychain.
/// Each key becomes an entry under `service`, with the key as the account name.
/// Entries are created once per key and reused.
#[derive(Debug)]
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = entries.get(key) {
            return Ok(Arc::clone(entry));
        }

        let entry = Entry::new(&self.service, key).map_err(|source| keyring_error(key, source))?;
        let entry = Arc::new(entry);
        entries.insert(key.to_string(), Arc::clone(&entry));
        Ok(entry)
    }
}

fn keyring_error(key: &str, source: keyring::Error) -> StorageError {
    StorageError::Keyring {
        key: key.to_string(),
        source,
    }
}

impl Storage for KeyringStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(source) => Err(keyring_error(key, source)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|source| keyring_error(key, source))?;
        debug!(key, service = %self.service, "Stored keychain entry");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(key, service = %self.service, "Removed keychain entry");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(source) => Err(keyring_error(key, source)),
        }
    }
}
