//! Session store: the single source of truth for who is signed in.
//!
//! Views and guards only ever see read-only snapshots ([`Session`]) or a
//! [`SessionHandle`]; every mutation goes through [`SessionStore`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use erpdesk_auth::{authorize, Credentials, Permission, Role, User};

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::storage::SessionVault;
use crate::types::{LoginRequest, RefreshRequest, TokenPair};

/// Snapshot of the client's authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    loading: bool,
}

/// Lifecycle position of a [`Session`].
///
/// `Loading` is left exactly once and never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Unauthenticated,
    Authenticated(Role),
}

impl Session {
    /// The state before restore has run.
    pub fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    /// A settled session (restore already done).
    pub fn resolved(user: Option<User>) -> Self {
        Self {
            user,
            loading: false,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> SessionState {
        match (&self.user, self.loading) {
            (_, true) => SessionState::Loading,
            (None, false) => SessionState::Unauthenticated,
            (Some(user), false) => SessionState::Authenticated(user.role),
        }
    }
}

/// Read-only, observable view of the session.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

struct Inner {
    api: ApiClient,
    vault: SessionVault,
    state: watch::Sender<Session>,
    restored: AtomicBool,
}

/// Owns the session and the operations that change it.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(api: ApiClient, vault: SessionVault) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            inner: Arc::new(Inner {
                api,
                vault,
                state,
                restored: AtomicBool::new(false),
            }),
        }
    }

    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionHandle {
        SessionHandle {
            rx: self.inner.state.subscribe(),
        }
    }

    /// Load the persisted user, then leave `Loading` for good.
    ///
    /// Only the first call does anything. The restored user is not checked
    /// against the backend here (see [`SessionStore::revalidate`]).
    pub async fn restore(&self) -> Session {
        if self.inner.restored.swap(true, Ordering::SeqCst) {
            return self.session();
        }

        let user = self.load_persisted_user().await;
        match &user {
            Some(user) => tracing::info!(username = %user.username, role = %user.role, "restored session"),
            None => tracing::info!("no persisted session"),
        }

        self.inner.state.send_modify(|session| {
            session.user = user;
            session.loading = false;
        });
        self.session()
    }

    async fn load_persisted_user(&self) -> Option<User> {
        let user = match self.inner.vault.user().await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable persisted session");
                self.clear_storage().await;
                return None;
            }
        };

        match self.inner.vault.access_token().await {
            Ok(Some(_)) => Some(user),
            Ok(None) => {
                tracing::warn!("persisted user has no access token; discarding");
                self.clear_storage().await;
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted access token");
                None
            }
        }
    }

    /// Authenticate, then load the profile (and the user directory for staff).
    ///
    /// Any failure clears everything before the error is returned.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        match self.try_login(username, password).await {
            Ok(user) => {
                tracing::info!(role = %user.role, "login succeeded");
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed; clearing session");
                self.logout().await;
                Err(err)
            }
        }
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let api = &self.inner.api;
        let vault = &self.inner.vault;

        let tokens: TokenPair = api
            .post_anonymous("/login/", &LoginRequest { username, password })
            .await?;
        vault.store_credentials(&Credentials::from(tokens)).await?;

        let user: User = api.get_json("/profile/").await?;
        vault.store_user(&user).await?;

        if authorize(user.role, Permission::ViewUsers).is_ok() {
            let users: Vec<User> = api.get_json("/users/").await?;
            vault.store_user_list(&users).await?;
        }

        let signed_in = user.clone();
        self.inner.state.send_modify(|session| session.user = Some(signed_in));
        Ok(user)
    }

    /// Forget the session locally. Never fails and never talks to the backend.
    pub async fn logout(&self) {
        self.clear_storage().await;
        let changed = self.inner.state.send_if_modified(|session| session.user.take().is_some());
        if changed {
            tracing::info!("logged out");
        }
    }

    /// Ask the backend to revoke the refresh token, then [`logout`](Self::logout).
    ///
    /// The backend call is best-effort; its outcome never blocks the logout.
    pub async fn sign_out(&self) {
        match self.inner.vault.refresh_token().await {
            Ok(Some(refresh)) => {
                let request = ApiRequest::post("/logout/")
                    .with_json(&RefreshRequest { refresh: &refresh });
                match request {
                    Ok(request) => match self.inner.api.execute(request).await {
                        Ok(response) if response.is_success() => {
                            tracing::debug!("refresh token revoked")
                        }
                        Ok(response) => {
                            tracing::debug!(status = response.status, "backend logout rejected")
                        }
                        Err(err) => tracing::debug!(error = %err, "backend logout failed"),
                    },
                    Err(err) => tracing::debug!(error = %err, "backend logout skipped"),
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read refresh token"),
        }
        self.logout().await;
    }

    /// Re-fetch the profile of a restored session.
    ///
    /// Returns the current user, or `None` when the backend no longer accepts
    /// the session (which is then logged out). Network failures keep the
    /// restored session and are returned as errors.
    pub async fn revalidate(&self) -> Result<Option<User>, ClientError> {
        if self.session().user().is_none() {
            return Ok(None);
        }

        match self.inner.api.get_json::<User>("/profile/").await {
            Ok(user) => {
                self.inner.vault.store_user(&user).await?;
                let fresh = user.clone();
                self.inner.state.send_if_modified(|session| {
                    if session.user.as_ref() == Some(&fresh) {
                        false
                    } else {
                        session.user = Some(fresh);
                        true
                    }
                });
                Ok(Some(user))
            }
            Err(ClientError::Authentication) => {
                tracing::warn!("restored session rejected by backend");
                self.logout().await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// User directory cached by the last login or dashboard change.
    pub async fn cached_users(&self) -> Result<Vec<User>, ClientError> {
        Ok(self.inner.vault.user_list().await?.unwrap_or_default())
    }

    /// Persist the user directory after a confirmed change.
    pub async fn remember_users(&self, users: &[User]) -> Result<(), ClientError> {
        Ok(self.inner.vault.store_user_list(users).await?)
    }

    /// `GET path` on behalf of the signed-in user.
    ///
    /// This and the other request helpers end the session when the backend
    /// still answers 401 after the refresh attempt, so a dead session never
    /// stays visible.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let outcome = self.inner.api.get_json(path).await;
        self.end_if_rejected(outcome).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let outcome = self.inner.api.post_json(path, body).await;
        self.end_if_rejected(outcome).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let outcome = self.inner.api.put_json(path, body).await;
        self.end_if_rejected(outcome).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let outcome = self.inner.api.delete(path).await;
        self.end_if_rejected(outcome).await
    }

    async fn end_if_rejected<T>(&self, outcome: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ClientError::Authentication) = &outcome {
            tracing::warn!("session rejected by backend; logging out");
            self.logout().await;
        }
        outcome
    }

    async fn clear_storage(&self) {
        if let Err(err) = self.inner.vault.clear().await {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
    }
}
