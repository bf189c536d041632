//! Staff dashboard: user list, role counts and the admin user modal.

use erpdesk_auth::{authorize, NewUser, Permission, Role, User, UserUpdate};
use erpdesk_core::validation::validate_user_form;
use erpdesk_core::{FieldErrors, FormMode, UserFormInput, UserId};

use crate::directory::{DirectoryStats, UserDirectory};
use crate::error::ClientError;
use crate::guards::Route;
use crate::session::SessionStore;

use super::Notice;

/// Which modal is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    Closed,
    Add,
    Edit(UserId),
    Delete(UserId),
}

/// Values of the add/edit form.
#[derive(Clone, PartialEq, Eq)]
pub struct UserForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    errors: FieldErrors,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            role: Role::Employee,
            errors: FieldErrors::new(),
        }
    }
}

impl std::fmt::Debug for UserForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl UserForm {
    /// Prefill from an existing user. The password stays empty.
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            ..Self::default()
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    fn validate(&mut self, mode: FormMode) -> Result<(), FieldErrors> {
        let input = UserFormInput {
            username: &self.username,
            first_name: &self.first_name,
            last_name: &self.last_name,
            email: &self.email,
            password: &self.password,
        };
        let outcome = validate_user_form(input, mode);
        self.errors = match &outcome {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors.clone(),
        };
        outcome
    }

    fn to_new_user(&self) -> NewUser {
        NewUser {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role,
            password: self.password.clone(),
        }
    }

    fn to_update(&self) -> UserUpdate {
        UserUpdate {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role,
        }
    }
}

pub struct DashboardView {
    session: SessionStore,
    viewer: User,
    directory: UserDirectory,
    modal: Modal,
    form: UserForm,
    notice: Option<Notice>,
}

impl DashboardView {
    /// Open the dashboard for the signed-in staff member.
    ///
    /// Starts from the user list cached at login; call [`load`](Self::load)
    /// to refresh it.
    pub async fn open(session: SessionStore) -> Result<Self, ClientError> {
        let viewer = session
            .session()
            .user()
            .cloned()
            .ok_or(ClientError::Authentication)?;
        authorize(viewer.role, Permission::ViewUsers)?;

        let directory = UserDirectory::new(session.cached_users().await?);
        Ok(Self {
            session,
            viewer,
            directory,
            modal: Modal::Closed,
            form: UserForm::default(),
            notice: None,
        })
    }

    pub fn viewer(&self) -> &User {
        &self.viewer
    }

    /// Fetch the list again. On failure the current list is kept.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let users: Vec<User> = self.session.get_json("/users/").await?;
        self.session.remember_users(&users).await?;
        self.directory.replace_all(users);
        Ok(())
    }

    pub fn visible_users(&self) -> Vec<&User> {
        self.directory.visible_to(self.viewer.role)
    }

    pub fn stats(&self) -> DirectoryStats {
        self.directory.stats()
    }

    pub fn modal(&self) -> Modal {
        self.modal
    }

    pub fn form(&self) -> &UserForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut UserForm {
        &mut self.form
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn open_add(&mut self) -> Result<(), ClientError> {
        self.require_manage()?;
        self.form = UserForm::default();
        self.modal = Modal::Add;
        Ok(())
    }

    pub fn open_edit(&mut self, id: UserId) -> Result<(), ClientError> {
        self.require_manage()?;
        let user = self.known_user(id)?;
        self.form = UserForm::from_user(user);
        self.modal = Modal::Edit(id);
        Ok(())
    }

    pub fn open_delete(&mut self, id: UserId) -> Result<(), ClientError> {
        self.require_manage()?;
        self.known_user(id)?;
        self.modal = Modal::Delete(id);
        Ok(())
    }

    pub fn close(&mut self) {
        self.modal = Modal::Closed;
        self.form = UserForm::default();
    }

    /// Submit the add or edit form.
    ///
    /// Only a confirmed backend answer touches the list. On failure the
    /// modal stays open so the user can retry.
    pub async fn save(&mut self) -> Result<User, ClientError> {
        let mode = match self.modal {
            Modal::Add => FormMode::Create,
            Modal::Edit(_) => FormMode::Edit,
            Modal::Closed | Modal::Delete(_) => {
                return Err(ClientError::InvalidAction("no user form is open".into()));
            }
        };
        self.form.validate(mode).map_err(ClientError::Validation)?;

        let session = &self.session;
        let outcome = match self.modal {
            Modal::Edit(id) => session
                .put_json::<_, User>(&format!("/users/{id}/"), &self.form.to_update())
                .await
                .map(|user| (user, "User updated successfully!")),
            _ => session
                .post_json::<_, User>("/users/create/", &self.form.to_new_user())
                .await
                .map(|user| (user, "User added successfully!")),
        };

        match outcome {
            Ok((user, message)) => {
                if mode == FormMode::Create || !self.directory.replace(user.clone()) {
                    self.directory.append(user.clone());
                }
                self.persist().await;
                self.close();
                tracing::info!(user_id = %user.id, "user saved");
                self.notice = Some(Notice::success(message));
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(error = %err, "saving user failed");
                self.notice = Some(Notice::error("Operation failed!"));
                Err(err)
            }
        }
    }

    pub async fn confirm_delete(&mut self) -> Result<(), ClientError> {
        let Modal::Delete(id) = self.modal else {
            return Err(ClientError::InvalidAction("no delete is pending".into()));
        };

        match self.session.delete(&format!("/users/{id}/")).await {
            Ok(()) => {
                self.directory.remove(id);
                self.persist().await;
                self.close();
                tracing::info!(user_id = %id, "user deleted");
                self.notice = Some(Notice::success("User deleted successfully!"));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "deleting user failed");
                self.notice = Some(Notice::error("Delete failed!"));
                Err(err)
            }
        }
    }

    pub async fn logout(&mut self) -> Route {
        self.session.sign_out().await;
        Route::Login
    }

    fn require_manage(&self) -> Result<(), ClientError> {
        Ok(authorize(self.viewer.role, Permission::ManageUsers)?)
    }

    fn known_user(&self, id: UserId) -> Result<&User, ClientError> {
        self.directory
            .get(id)
            .ok_or_else(|| ClientError::InvalidAction(format!("unknown user {id}")))
    }

    async fn persist(&self) {
        if let Err(err) = self.session.remember_users(self.directory.users()).await {
            tracing::warn!(error = %err, "failed to cache user list");
        }
    }
}
