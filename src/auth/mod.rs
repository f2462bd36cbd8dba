//! Auth session bootstrap
//!
//! Holds the signed-in user. The user is fetched from `/core/me/` once at
//! startup when an access token is stored; a 401/403 clears the session.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::storage::SessionTokens;

/// Current user endpoint
pub const ME_PATH: &str = "/core/me/";

/// Token issue endpoint
pub const TOKEN_PATH: &str = "/token/";

/// Role of a user inside the current tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Owner,
    Admin,
    Teacher,
    Staff,
    Student,
    Parent,
}

impl TenantRole {
    /// Roles that use the admin application
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Teacher | Self::Staff)
    }

    /// Roles that use the student application
    pub fn is_learner(&self) -> bool {
        matches!(self, Self::Student | Self::Parent)
    }
}

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default, alias = "tenantRole")]
    pub tenant_role: Option<TenantRole>,
}

/// Result of the startup session check
#[derive(Debug)]
pub enum BootstrapOutcome {
    /// Token valid, user loaded
    SignedIn(User),
    /// No token, or the token was rejected and cleared
    SignedOut,
    /// The check itself failed (network, 5xx); prior state kept
    Failed(Error),
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Owns the current user
pub struct AuthService {
    client: ApiClient,
    user: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            user: RwLock::new(None),
        }
    }

    /// Signed-in user, if known
    pub fn current_user(&self) -> Option<User> {
        self.user.read().ok().and_then(|u| u.clone())
    }

    /// True when a staff user is signed in
    pub fn is_staff(&self) -> bool {
        self.current_user().is_some_and(|u| u.is_staff)
    }

    /// Re-read the current user from the backend
    ///
    /// - no stored access token: user cleared, `Ok(None)`, no request
    /// - 401/403: tokens and user cleared, error returned
    /// - any other failure: user left as it was, error returned
    pub async fn refresh_me(&self) -> Result<Option<User>> {
        let store = self.client.store();
        if SessionTokens::access(store.as_ref()).is_none() {
            self.set_user(None);
            return Ok(None);
        }

        match self.client.get::<User>(ME_PATH).await {
            Ok(user) => {
                tracing::debug!(user_id = user.id, "Current user refreshed");
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) => {
                let err = Error::from(e);
                if err.is_auth_failure() {
                    tracing::info!(status = ?err.status(), "Session rejected, clearing tokens");
                    self.clear_auth();
                } else {
                    tracing::warn!(error = %err, "Current user refresh failed");
                }
                Err(err)
            }
        }
    }

    /// Run the startup session check exactly once
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        match self.refresh_me().await {
            Ok(Some(user)) => {
                tracing::info!(username = %user.username, "Signed in");
                BootstrapOutcome::SignedIn(user)
            }
            Ok(None) => BootstrapOutcome::SignedOut,
            Err(e) if e.is_auth_failure() => BootstrapOutcome::SignedOut,
            Err(e) => BootstrapOutcome::Failed(e),
        }
    }

    /// Exchange credentials for tokens, then load the user
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let pair: TokenPair = self
            .client
            .post(TOKEN_PATH, &Credentials { username, password })
            .await?;

        SessionTokens::store(self.client.store().as_ref(), &pair.access, pair.refresh.as_deref())?;

        self.refresh_me()
            .await?
            .ok_or_else(|| Error::other("로그인 후 사용자 정보를 불러오지 못했습니다."))
    }

    /// Clear tokens and the user
    pub fn logout(&self) {
        self.clear_auth();
        tracing::info!("Signed out");
    }

    fn clear_auth(&self) {
        SessionTokens::clear(self.client.store().as_ref());
        self.set_user(None);
    }

    fn set_user(&self, user: Option<User>) {
        match self.user.write() {
            Ok(mut slot) => *slot = user,
            Err(poisoned) => *poisoned.into_inner() = user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_user_deserializes_camel_role() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "username": "kim",
            "is_staff": true,
            "tenantRole": "teacher"
        }))
        .unwrap();
        assert_eq!(user.tenant_role, Some(TenantRole::Teacher));
        assert!(user.tenant_role.unwrap().is_operator());
        assert!(user.email.is_none());
    }

    #[test]
    fn test_roles() {
        assert!(TenantRole::Parent.is_learner());
        assert!(!TenantRole::Parent.is_operator());
    }

    #[tokio::test]
    async fn test_refresh_without_token_skips_request() {
        // Unroutable origin: a request would fail, so Ok(None) proves none was sent
        let client = ApiClient::with_base_url("http://127.0.0.1:9", MemoryStore::shared()).unwrap();
        let auth = AuthService::new(client);
        assert!(auth.refresh_me().await.unwrap().is_none());
        assert!(matches!(auth.bootstrap().await, BootstrapOutcome::SignedOut));
    }
}
