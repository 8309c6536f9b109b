// Persisted session credentials on top of a `KeyValueStore`.
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::model::{AuthSession, TokenPair, UserProfile};
use crate::storage::{FileStore, KeyValueStore};
use std::sync::Arc;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_DATA_KEY: &str = "userData";
pub const IS_LOGGED_IN_KEY: &str = "isLoggedIn";

/// Every key that belongs to a session; all are removed on purge.
pub const SESSION_KEYS: [&str; 4] = [
    AUTH_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    USER_DATA_KEY,
    IS_LOGGED_IN_KEY,
];

/// Typed access to the session keys.
///
/// Cheap to clone; clones share the same backing store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Session persisted in the context's data directory.
    pub fn for_context(ctx: &dyn AppContext) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(FileStore::for_context(ctx)?)))
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn access_token(&self) -> ClientResult<Option<String>> {
        Ok(self
            .store
            .get(AUTH_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty()))
    }

    pub async fn refresh_token(&self) -> ClientResult<Option<String>> {
        Ok(self
            .store
            .get(REFRESH_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty()))
    }

    /// Replaces both tokens, as after a refresh exchange.
    pub async fn store_tokens(&self, tokens: &TokenPair) -> ClientResult<()> {
        self.store
            .set_many(&[
                (AUTH_TOKEN_KEY, tokens.access_token.as_str()),
                (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
            ])
            .await
    }

    /// Persists a fresh login or registration.
    pub async fn store_session(&self, session: &AuthSession) -> ClientResult<()> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| ClientError::StorageWrite(e.to_string()))?;
        self.store
            .set_many(&[
                (AUTH_TOKEN_KEY, session.tokens.access_token.as_str()),
                (REFRESH_TOKEN_KEY, session.tokens.refresh_token.as_str()),
                (USER_DATA_KEY, user_json.as_str()),
                (IS_LOGGED_IN_KEY, "true"),
            ])
            .await
    }

    pub async fn store_user(&self, user: &UserProfile) -> ClientResult<()> {
        let user_json =
            serde_json::to_string(user).map_err(|e| ClientError::StorageWrite(e.to_string()))?;
        self.store.set(USER_DATA_KEY, &user_json).await
    }

    /// Cached profile. A value that no longer parses is treated as absent.
    pub async fn user(&self) -> ClientResult<Option<UserProfile>> {
        let Some(raw) = self.store.get(USER_DATA_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                log::warn!("Ignoring unreadable cached user profile: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn is_logged_in(&self) -> ClientResult<bool> {
        let flag = self.store.get(IS_LOGGED_IN_KEY).await?;
        Ok(matches!(flag.as_deref(), Some("true")))
    }

    /// Removes every session key.
    pub async fn purge(&self) -> ClientResult<()> {
        self.store.remove_many(&SESSION_KEYS).await
    }
}
