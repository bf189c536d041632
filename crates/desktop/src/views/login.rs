//! Login screen.

use erpdesk_core::validation::{validate_login, validate_login_field};
use erpdesk_core::{Field, FieldErrors, LoginInput};

use crate::error::{ClientError, ErrorKind};
use crate::guards::Route;
use crate::session::SessionStore;

use super::Notice;

pub struct LoginView {
    session: SessionStore,
    username: String,
    password: String,
    errors: FieldErrors,
    submitting: bool,
    notice: Option<Notice>,
}

impl LoginView {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            username: String::new(),
            password: String::new(),
            errors: FieldErrors::new(),
            submitting: false,
            notice: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Update the username and re-check just that field.
    pub fn set_username(&mut self, value: impl Into<String>) {
        self.username = value.into();
        self.errors
            .set(Field::Username, validate_login_field(Field::Username, &self.username));
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.password = value.into();
        self.errors
            .set(Field::Password, validate_login_field(Field::Password, &self.password));
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Validate, sign in, and return the route to go to.
    ///
    /// An invalid form is rejected without any request.
    pub async fn submit(&mut self) -> Result<Route, ClientError> {
        let input = LoginInput {
            username: &self.username,
            password: &self.password,
        };
        if let Err(errors) = validate_login(input) {
            self.errors = errors.clone();
            return Err(ClientError::Validation(errors));
        }
        self.errors.clear();

        self.submitting = true;
        let outcome = self.session.login(self.username.trim(), &self.password).await;
        self.submitting = false;

        match outcome {
            Ok(user) => {
                self.password.clear();
                self.notice = Some(Notice::success("Login successful!"));
                Ok(Route::home_for(user.role))
            }
            Err(err) => {
                let message = match err.kind() {
                    ErrorKind::Authentication => "Invalid credentials!",
                    _ => "Login failed!",
                };
                self.notice = Some(Notice::error(message));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiClient;
    use crate::storage::{MemoryStorage, SessionVault};
    use crate::test_support::FakeBackend;
    use std::sync::Arc;

    fn view(backend: Arc<FakeBackend>) -> LoginView {
        let vault = SessionVault::new(Arc::new(MemoryStorage::new()));
        let api = ApiClient::new(backend, vault.clone());
        LoginView::new(SessionStore::new(api, vault))
    }

    #[test]
    fn live_validation_tracks_each_field() {
        let mut view = view(FakeBackend::seeded());

        view.set_username("ab");
        assert_eq!(
            view.errors().get(Field::Username),
            Some("Username must be 4-20 characters, alphanumeric, _ or .")
        );
        assert_eq!(view.errors().get(Field::Password), None);

        view.set_username("abcd");
        assert!(view.errors().is_empty());
    }

    #[tokio::test]
    async fn invalid_form_makes_no_request() {
        let backend = FakeBackend::seeded();
        let mut view = view(backend.clone());
        view.set_username("ab");
        view.set_password("");

        let err = view.submit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(view.errors().len(), 2);
        assert!(backend.calls().is_empty());
        assert!(view.notice().is_none());
    }

    #[tokio::test]
    async fn manager_lands_on_dashboard() {
        let mut view = view(FakeBackend::seeded());
        view.set_username("manager");
        view.set_password("manager@123");

        assert_eq!(view.submit().await.unwrap(), Route::Dashboard);
        assert_eq!(view.notice(), Some(&Notice::success("Login successful!")));
        assert!(!view.is_submitting());
    }

    #[tokio::test]
    async fn wrong_password_reports_invalid_credentials() {
        let mut view = view(FakeBackend::seeded());
        view.set_username("user");
        view.set_password("wrong@123");

        assert!(view.submit().await.is_err());
        assert_eq!(view.notice(), Some(&Notice::error("Invalid credentials!")));
    }

    #[tokio::test]
    async fn backend_trouble_reports_login_failed() {
        let backend = FakeBackend::seeded();
        backend.fail(crate::http::Method::Post, "/login/", 500);
        let mut view = view(backend);
        view.set_username("user");
        view.set_password("user@123");

        assert!(view.submit().await.is_err());
        assert_eq!(view.notice(), Some(&Notice::error("Login failed!")));
    }
}
