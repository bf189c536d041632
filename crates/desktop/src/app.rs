//! Application wiring: config, storage, transport, session store and router.

use std::sync::Arc;

use crate::config::{ClientConfig, RestorePolicy, StorageLocation};
use crate::error::ClientError;
use crate::guards::{Resolution, Router};
use crate::http::{ApiClient, HttpTransport, Transport};
use crate::session::{Session, SessionHandle, SessionStore};
use crate::storage::{MemoryStorage, SessionStorage, SessionVault, SqliteStorage};
use crate::views::{DashboardView, LoginView, ProfileView};

/// Everything a client front end needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ClientConfig>,
    session: SessionStore,
    router: Arc<Router>,
}

impl AppState {
    /// Build the real stack described by `config`.
    ///
    /// The SQLite database is opened lazily on first use.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config.api_url, config.request_timeout)
            .map_err(|e| ClientError::Network(e.0))?;

        let storage: Arc<dyn SessionStorage> = match &config.storage {
            StorageLocation::Memory => Arc::new(MemoryStorage::new()),
            StorageLocation::Directory(dir) => Arc::new(SqliteStorage::in_directory(dir)),
            StorageLocation::Default => Arc::new(SqliteStorage::in_default_location()?),
        };

        Ok(Self::with_parts(config, Arc::new(transport), storage))
    }

    /// Assemble from explicit parts (tests, alternative transports).
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let vault = SessionVault::new(storage);
        let api = ApiClient::new(transport, vault.clone());
        Self {
            config: Arc::new(config),
            session: SessionStore::new(api, vault),
            router: Arc::new(Router::standard()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn subscribe(&self) -> SessionHandle {
        self.session.subscribe()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Restore the persisted session and apply the restore policy.
    ///
    /// A revalidation that fails for network reasons keeps the restored
    /// session.
    pub async fn start(&self) -> Session {
        let session = self.session.restore().await;
        if self.config.restore_policy == RestorePolicy::Revalidate && session.user().is_some() {
            if let Err(err) = self.session.revalidate().await {
                tracing::warn!(error = %err, "could not revalidate restored session");
            }
        }
        self.session.session()
    }

    /// Where `path` leads for the current session.
    pub fn navigate(&self, path: &str) -> Resolution {
        self.router.resolve(path, &self.session.session())
    }

    pub fn login_view(&self) -> LoginView {
        LoginView::new(self.session.clone())
    }

    pub fn profile_view(&self) -> ProfileView {
        ProfileView::new(self.session.clone())
    }

    pub async fn dashboard_view(&self) -> Result<DashboardView, ClientError> {
        DashboardView::open(self.session.clone()).await
    }
}
