//! Caller identity data owned by the backend's auth layer.

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
pub const ROLE_GUEST: &str = "guest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::User => ROLE_USER,
            UserRole::Guest => ROLE_GUEST,
        }
    }

    /// Only admins may edit drafts and publish.
    pub fn can_edit(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}
