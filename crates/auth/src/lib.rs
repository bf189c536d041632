//! `erpdesk-auth`: roles, permissions and the identity records the client holds.
//!
//! No HTTP, no storage. Decisions made here only shape what the client shows;
//! the backend re-checks all of them.

pub mod authorize;
pub mod credentials;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{authorize, visible_users, AuthzError};
pub use credentials::Credentials;
pub use permissions::Permission;
pub use roles::Role;
pub use user::{NewUser, User, UserUpdate};
