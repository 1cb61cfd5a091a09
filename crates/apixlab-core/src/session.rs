//! Session model and persistence.
//!
//! A session is the `{token, userId, profileName}` triple issued by the
//! backend. It is stored as JSON under a fixed key in a [`KeyValueStorage`].
//! Tokens are never logged in full.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::storage::KeyValueStorage;

/// Credentials issued by a successful login.
///
/// Token and user id only exist as a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

/// Authenticated user session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
    profile_name: String,
}

/// Wire form of a persisted session.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    profile_name: String,
}

impl Session {
    /// Creates a freshly authenticated session without a profile name.
    pub fn authenticated(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            credentials: Some(Credentials {
                token: token.into(),
                user_id: user_id.into(),
            }),
            profile_name: String::new(),
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.user_id.as_str())
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns true when credentials exist but no profile name was fetched.
    pub fn needs_profile(&self) -> bool {
        self.is_authenticated() && self.profile_name.is_empty()
    }

    /// Returns a copy with the profile name merged in.
    ///
    /// Profile names only attach to authenticated sessions.
    #[must_use]
    pub fn with_profile_name(&self, name: impl Into<String>) -> Self {
        if !self.is_authenticated() {
            return self.clone();
        }
        Self {
            credentials: self.credentials.clone(),
            profile_name: name.into(),
        }
    }

    /// Encodes the session as stored JSON.
    pub fn to_json(&self) -> String {
        let stored = StoredSession {
            token: self.token().map(str::to_string),
            user_id: self.user_id().map(str::to_string),
            profile_name: self.profile_name.clone(),
        };
        // Plain strings and options: serialization cannot fail.
        serde_json::to_string(&stored).unwrap_or_default()
    }

    /// Decodes stored JSON.
    ///
    /// Returns `None` when the JSON is unreadable or carries only one of
    /// token/userId.
    pub fn from_json(json: &str) -> Option<Self> {
        let stored: StoredSession = serde_json::from_str(json).ok()?;
        let token = stored.token.filter(|t| !t.is_empty());
        let user_id = stored.user_id.filter(|u| !u.is_empty());
        match (token, user_id) {
            (Some(token), Some(user_id)) => Some(Self {
                credentials: Some(Credentials { token, user_id }),
                profile_name: stored.profile_name,
            }),
            (None, None) => Some(Self::default()),
            _ => None,
        }
    }
}

/// Persists a [`Session`] under a fixed storage key.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Loads the persisted session.
    ///
    /// Absent, malformed, or unreadable entries yield the empty session.
    pub fn load(&self) -> Session {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Session::default(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read stored session");
                return Session::default();
            }
        };

        Session::from_json(&raw).unwrap_or_else(|| {
            tracing::warn!(key = %self.key, "discarding malformed stored session");
            Session::default()
        })
    }

    /// Persists the session, replacing the stored value.
    ///
    /// # Errors
    /// Returns a storage error if the value cannot be written.
    pub fn save(&self, session: &Session) -> AuthResult<()> {
        self.storage.set(&self.key, &session.to_json())
    }

    /// Resets storage to the empty session value.
    ///
    /// # Errors
    /// Returns a storage error if the value cannot be written.
    pub fn clear(&self) -> AuthResult<()> {
        self.save(&Session::default())
            .map_err(|e| AuthError::storage(format!("Failed to clear session: {e}")))
    }
}

/// Returns a masked version of a secret for display (first 8 chars + ...).
pub fn mask_secret(secret: &str) -> String {
    if secret.len() <= 12 || !secret.is_ascii() {
        return "***".to_string();
    }
    format!("{}...", &secret[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::clone(&storage) as Arc<dyn KeyValueStorage>, "apixlab.session");
        (storage, store)
    }

    #[test]
    fn test_authenticated_sets_both_fields() {
        let session = Session::authenticated("tok_1", "42");
        assert_eq!(session.token(), Some("tok_1"));
        assert_eq!(session.user_id(), Some("42"));
        assert_eq!(session.profile_name(), "");
        assert!(session.needs_profile());
    }

    #[test]
    fn test_default_has_neither_field() {
        let session = Session::default();
        assert_eq!(session.token(), None);
        assert_eq!(session.user_id(), None);
        assert!(!session.needs_profile());
    }

    #[test]
    fn test_json_shape_uses_camel_case_keys() {
        let session = Session::authenticated("tok_1", "42").with_profile_name("Ada");
        let value: serde_json::Value = serde_json::from_str(&session.to_json()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"token": "tok_1", "userId": "42", "profileName": "Ada"})
        );
    }

    #[test]
    fn test_half_session_is_malformed() {
        assert_eq!(Session::from_json(r#"{"token":"t","userId":null}"#), None);
        assert_eq!(Session::from_json(r#"{"userId":"42"}"#), None);
        assert_eq!(Session::from_json("[1,2]"), None);
    }

    #[test]
    fn test_profile_name_needs_credentials() {
        let session = Session::default().with_profile_name("Ada");
        assert_eq!(session.profile_name(), "");
    }

    #[test]
    fn test_store_falls_back_on_malformed_entry() {
        let (storage, store) = store();
        storage.set("apixlab.session", "{garbage").unwrap();
        assert_eq!(store.load(), Session::default());

        storage
            .set("apixlab.session", r#"{"token":"t","profileName":"x"}"#)
            .unwrap();
        assert_eq!(store.load(), Session::default());
    }

    #[test]
    fn test_store_roundtrip_and_clear() {
        let (storage, store) = store();
        let session = Session::authenticated("tok_1", "42").with_profile_name("Ada");
        store.save(&session).unwrap();
        assert_eq!(store.load(), session);

        store.clear().unwrap();
        assert_eq!(store.load(), Session::default());
        let raw = storage.get("apixlab.session").unwrap().unwrap();
        assert_eq!(raw, Session::default().to_json());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGci...");
        assert_eq!(mask_secret("short"), "***");
    }
}
