//! Core library for vs-auth.
//!
//! Persists the VideoShare access token and user profile into a pluggable
//! storage area and reads them back for later requests.

pub mod auth;
pub mod config;
pub mod storage;

pub use auth::{AuthPayload, CredentialStore, StoreError, User};
pub use config::{Config, StorageBackend};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, Storage, StorageError};
