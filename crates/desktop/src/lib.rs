//! `erpdesk-desktop`
//!
//! **Responsibility:** role-based admin client for the ERP user service.
//!
//! This crate provides:
//! - An HTTP client wrapper that injects bearer tokens and refreshes an
//!   expired access token at most once per request
//! - A session store (login, logout, restore-on-start) over persisted storage
//! - Route guards deciding which view a session may see
//! - View models for the login form, the profile page and the user dashboard
//!
//! The client is a **thin shell** around the backend API: the backend stays the
//! authority for credentials, permissions and data.

pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod guards;
pub mod http;
pub mod session;
pub mod storage;
pub mod types;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::AppState;
pub use config::{ClientConfig, RestorePolicy, StorageLocation};
pub use directory::{DirectoryStats, UserDirectory};
pub use error::{ClientError, ErrorKind};
pub use guards::{Navigation, ProtectedRoute, PublicRoute, Resolution, Route, RouteGuard, Router};
pub use http::{ApiClient, ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
pub use session::{Session, SessionHandle, SessionState, SessionStore};
pub use storage::{MemoryStorage, SessionStorage, SessionVault, SqliteStorage, StorageError, StorageKey};
