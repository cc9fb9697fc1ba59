use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token type reported by the VideoShare login endpoint
pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

/// What a successful login hands back: the access token and the user it belongs to.
///
/// Generic over the user type so callers can store any serializable profile,
/// including a loose `serde_json::Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload<U = User> {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: U,
}

impl<U> AuthPayload<U> {
    pub fn new(access_token: impl Into<String>, user: U) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            user,
        }
    }
}

/// Profile of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name and email, e.g. "Ana Silva <ana@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}
