//! View models for the three client screens.
//!
//! Each view owns its form state and talks to the backend through the
//! [`SessionStore`](crate::SessionStore) it was opened with. Rendering is up to
//! the caller; the CLI prints them as text.

pub mod dashboard;
pub mod login;
pub mod profile;

pub use dashboard::{DashboardView, Modal, UserForm};
pub use login::LoginView;
pub use profile::{ProfileCard, ProfileView};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message shown after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
