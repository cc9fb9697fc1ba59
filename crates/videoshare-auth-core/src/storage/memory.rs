use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Storage, StorageError};

/// Storage area held in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    // A panic mid-insert cannot leave the map half-written, so a poisoned lock is still usable.
    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("VS_TOKEN").unwrap(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let storage = MemoryStorage::new();
        storage.set_item("VS_TOKEN", "first").unwrap();
        storage.set_item("VS_TOKEN", "second").unwrap();

        assert_eq!(storage.get_item("VS_TOKEN").unwrap().as_deref(), Some("second"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let storage = MemoryStorage::new();
        storage.remove_item("VS_USER").unwrap();
        storage.remove_item("VS_USER").unwrap();
        assert!(storage.is_empty());
    }
}
