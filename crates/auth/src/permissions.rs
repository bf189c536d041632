use serde::{Deserialize, Serialize};

use crate::Role;

/// Action a role may take in the admin client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Read the user directory (`GET /users/`).
    ViewUsers,
    /// Create, edit and delete accounts.
    ManageUsers,
    /// Read one's own profile.
    ViewProfile,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewUsers => "users.read",
            Permission::ManageUsers => "users.manage",
            Permission::ViewProfile => "profile.read",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Permissions granted to this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::ViewUsers,
                Permission::ManageUsers,
                Permission::ViewProfile,
            ],
            Role::Manager => &[Permission::ViewUsers, Permission::ViewProfile],
            Role::Employee => &[Permission::ViewProfile],
        }
    }
}
