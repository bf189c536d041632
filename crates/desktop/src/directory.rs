//! In-memory user list held by the dashboard.

use erpdesk_auth::{visible_users, Role, User};
use erpdesk_core::{Entity, UserId};

/// Role counts over the whole list, whoever is looking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub total: usize,
    pub admins: usize,
    pub managers: usize,
    pub employees: usize,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id() == id)
    }

    pub fn replace_all(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub fn append(&mut self, user: User) {
        self.users.push(user);
    }

    /// Swap in `user` where an entry with the same id sits.
    ///
    /// Returns `false` (and leaves the list alone) when no entry matches.
    pub fn replace(&mut self, user: User) -> bool {
        match self.users.iter_mut().find(|u| u.id() == user.id()) {
            Some(slot) => {
                *slot = user;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: UserId) -> Option<User> {
        let index = self.users.iter().position(|u| u.id() == id)?;
        Some(self.users.remove(index))
    }

    pub fn visible_to(&self, viewer: Role) -> Vec<&User> {
        visible_users(viewer, &self.users).collect()
    }

    pub fn stats(&self) -> DirectoryStats {
        self.users.iter().fold(
            DirectoryStats {
                total: self.users.len(),
                ..DirectoryStats::default()
            },
            |mut stats, user| {
                match user.role {
                    Role::Admin => stats.admins += 1,
                    Role::Manager => stats.managers += 1,
                    Role::Employee => stats.employees += 1,
                }
                stats
            },
        )
    }
}
