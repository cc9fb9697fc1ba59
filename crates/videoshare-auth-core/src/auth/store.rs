use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{Storage, StorageError};

use super::{AuthPayload, User};

/// Key holding the raw access token
pub const TOKEN_KEY: &str = "VS_TOKEN";

/// Key holding the JSON-encoded user profile
pub const USER_KEY: &str = "VS_USER";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to serialize user: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Keeps the access token and current user in a storage area.
///
/// The token and user are written and cleared together, but not atomically:
/// a failure between the two keys can leave one without the other.
pub struct CredentialStore<S> {
    storage: S,
}

impl<S: Storage> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Store the token and user from a login, replacing any previous ones
    pub fn save<U: Serialize>(&self, payload: &AuthPayload<U>) -> Result<(), StoreError> {
        let user = serde_json::to_string(&payload.user).map_err(StoreError::Serialize)?;

        self.storage.set_item(TOKEN_KEY, &payload.access_token)?;
        self.storage.set_item(USER_KEY, &user)?;
        debug!("Saved credentials");
        Ok(())
    }

    /// The stored access token, if any
    pub fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.storage.get_item(TOKEN_KEY)?)
    }

    /// The stored user, or `None` if nothing usable is stored.
    ///
    /// Text that is not JSON, is JSON `null`, or does not fit `U` reads as `None`.
    pub fn current_user<U: DeserializeOwned>(&self) -> Result<Option<U>, StoreError> {
        let Some(raw) = self.storage.get_item(USER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Option<U>>(&raw) {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored user");
                Ok(None)
            }
        }
    }

    /// `current_user` for the default `User` profile
    pub fn user(&self) -> Result<Option<User>, StoreError> {
        self.current_user()
    }

    /// Remove the token and user. Safe to call when nothing is stored.
    pub fn logout(&self) -> Result<(), StoreError> {
        let token = self.storage.remove_item(TOKEN_KEY);
        let user = self.storage.remove_item(USER_KEY);
        token?;
        user?;
        debug!("Cleared credentials");
        Ok(())
    }

    /// Check if a non-empty token is stored
    pub fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.token()?.is_some_and(|t| !t.is_empty()))
    }

    /// `Authorization` header value for authenticated requests
    pub fn authorization_header(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .token()?
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {}", t)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};
    use serde::Deserialize;
    use serde_json::json;

    fn sample_user() -> User {
        User {
            id: 42,
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 17, 8, 0, 0).unwrap(),
        }
    }

    fn logged_in() -> CredentialStore<MemoryStorage> {
        let store = CredentialStore::new(MemoryStorage::new());
        store
            .save(&AuthPayload::new("tok-abc", sample_user()))
            .unwrap();
        store
    }

    #[test]
    fn test_save_then_token() {
        let store = logged_in();
        assert_eq!(store.token().unwrap().as_deref(), Some("tok-abc"));
    }

    #[test]
    fn test_save_then_current_user() {
        let store = logged_in();
        assert_eq!(store.user().unwrap(), Some(sample_user()));
    }

    #[test]
    fn test_stored_layout() {
        let store = logged_in();
        let storage = store.storage();

        assert_eq!(storage.get_item(TOKEN_KEY).unwrap().as_deref(), Some("tok-abc"));
        let raw = storage.get_item(USER_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["email"], "ana@example.com");
        assert_eq!(value["created_at"], "2024-05-17T08:00:00Z");
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_save_overwrites_previous_login() {
        let store = logged_in();
        let other = User {
            id: 43,
            name: "Bo".to_string(),
            ..sample_user()
        };
        store.save(&AuthPayload::new("tok-new", other.clone())).unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some("tok-new"));
        assert_eq!(store.user().unwrap(), Some(other));
    }

    #[test]
    fn test_untyped_user_roundtrip() {
        let store = CredentialStore::new(MemoryStorage::new());
        let user = json!({"id": 1, "roles": ["viewer"], "extra": {"nested": null}});
        store.save(&AuthPayload::new("t", user.clone())).unwrap();

        let loaded: Option<serde_json::Value> = store.current_user().unwrap();
        assert_eq!(loaded, Some(user));
    }

    #[test]
    fn test_logout_clears_both() {
        let store = logged_in();
        store.logout().unwrap();

        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.user().unwrap(), None);
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let store = logged_in();
        store.logout().unwrap();
        store.logout().unwrap();

        assert_eq!(store.token().unwrap(), None);
        assert!(store.storage().is_empty());

        let fresh = CredentialStore::new(MemoryStorage::new());
        fresh.logout().unwrap();
    }

    #[test]
    fn test_corrupt_user_reads_as_none() {
        let store = CredentialStore::new(MemoryStorage::new());
        store.storage().set_item(USER_KEY, "{not json").unwrap();
        assert_eq!(store.user().unwrap(), None);

        store.storage().set_item(USER_KEY, "").unwrap();
        assert_eq!(store.user().unwrap(), None);
    }

    #[test]
    fn test_null_user_reads_as_none() {
        let store = CredentialStore::new(MemoryStorage::new());
        store.storage().set_item(USER_KEY, "null").unwrap();
        assert_eq!(store.current_user::<serde_json::Value>().unwrap(), None);
    }

    #[test]
    fn test_wrong_shape_reads_as_none() {
        let store = CredentialStore::new(MemoryStorage::new());
        store.save(&AuthPayload::new("t", json!({"id": "not-a-number"}))).unwrap();
        assert_eq!(store.user().unwrap(), None);
    }

    #[test]
    fn test_unserializable_user_writes_nothing() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut user = HashMap::new();
        user.insert(vec![1u8], "x");

        let store = CredentialStore::new(MemoryStorage::new());
        let err = store.save(&AuthPayload::new("t", user)).unwrap_err();
        assert!(matches!(err, StoreError::Serialize(_)));
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_authorization_header() {
        let store = logged_in();
        assert!(store.is_authenticated().unwrap());
        assert_eq!(
            store.authorization_header().unwrap().as_deref(),
            Some("Bearer tok-abc")
        );

        store.logout().unwrap();
        assert!(!store.is_authenticated().unwrap());
        assert_eq!(store.authorization_header().unwrap(), None);
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let store = CredentialStore::new(MemoryStorage::new());
        store.save(&AuthPayload::new("", sample_user())).unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some(""));
        assert!(!store.is_authenticated().unwrap());
    }

    #[test]
    fn test_custom_user_type() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Profile {
            handle: String,
        }

        let store = CredentialStore::new(MemoryStorage::new());
        store
            .save(&AuthPayload::new("t", Profile { handle: "ana".to_string() }))
            .unwrap();

        let loaded: Option<Profile> = store.current_user().unwrap();
        assert_eq!(loaded, Some(Profile { handle: "ana".to_string() }));
    }

    #[test]
    fn test_logout_clears_truncated_storage_file() {
        use crate::storage::FileStorage;

        let dir = std::env::temp_dir().join(format!("vs_store_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let storage = FileStorage::in_dir(&dir);
        std::fs::write(storage.path(), "{\n  \"VS_TOKEN\": \"tok").unwrap();

        let store = CredentialStore::new(storage);
        store.logout().unwrap();
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.user().unwrap(), None);

        store.save(&AuthPayload::new("tok-2", sample_user())).unwrap();
        assert_eq!(store.token().unwrap().as_deref(), Some("tok-2"));
        assert_eq!(store.user().unwrap(), Some(sample_user()));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
