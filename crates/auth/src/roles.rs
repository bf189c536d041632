use core::str::FromStr;

use serde::{Deserialize, Serialize};

use erpdesk_core::DomainError;

/// Role assigned to every account by the backend.
///
/// Serialized exactly as the backend spells it (`"Admin"`, `"Manager"`,
/// `"Employee"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Employee => "Employee",
        }
    }

    /// Admins and Managers work from the user dashboard.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::unknown_role(s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_backend_spelling() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"Manager\"");
        let role: Role = serde_json::from_str("\"Employee\"").unwrap();
        assert_eq!(role, Role::Employee);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" MANAGER ".parse::<Role>().unwrap(), Role::Manager);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_and_manager_are_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Manager.is_staff());
        assert!(!Role::Employee.is_staff());
    }
}
