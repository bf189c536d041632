//! Employee profile screen.

use erpdesk_auth::Role;

use crate::guards::Route;
use crate::session::SessionStore;

use super::Notice;

/// What the profile screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCard {
    pub greeting: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

pub struct ProfileView {
    session: SessionStore,
    notice: Option<Notice>,
}

impl ProfileView {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            notice: None,
        }
    }

    /// `None` when nobody is signed in.
    pub fn render(&self) -> Option<ProfileCard> {
        let session = self.session.session();
        let user = session.user()?;
        Some(ProfileCard {
            greeting: format!("Welcome, {}!", user.username),
            role: user.role,
            name: user.display_name(),
            email: user.email.clone(),
        })
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub async fn logout(&mut self) -> Route {
        self.session.sign_out().await;
        self.notice = Some(Notice::success("Successfully logged out!"));
        Route::Login
    }
}
