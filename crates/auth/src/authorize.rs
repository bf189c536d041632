use thiserror::Error;

use crate::{Permission, Role, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks permission '{permission}'")]
    Forbidden { role: Role, permission: Permission },
}

/// Check a role against a required permission.
///
/// - No IO
/// - No panics
pub fn authorize(role: Role, required: Permission) -> Result<(), AuthzError> {
    if role.permissions().contains(&required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role,
            permission: required,
        })
    }
}

/// Users a viewer is shown on the dashboard.
///
/// Managers only see Employees; Admins see everyone; Employees see nobody.
pub fn visible_users<'a>(viewer: Role, users: &'a [User]) -> impl Iterator<Item = &'a User> + 'a {
    users.iter().filter(move |user| match viewer {
        Role::Admin => true,
        Role::Manager => user.role == Role::Employee,
        Role::Employee => false,
    })
}
