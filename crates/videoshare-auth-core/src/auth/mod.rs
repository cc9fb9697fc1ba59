//! Authentication state kept between runs.
//!
//! This module provides:
//! - `AuthPayload`, `User`: what a successful login returns
//! - `CredentialStore`: saves the token and user, reads them back, clears them on logout
//!
//! The token lives under `VS_TOKEN` as-is and the user under `VS_USER` as JSON.

pub mod payload;
pub mod store;

pub use payload::{AuthPayload, User, DEFAULT_TOKEN_TYPE};
pub use store::{CredentialStore, StoreError, TOKEN_KEY, USER_KEY};
