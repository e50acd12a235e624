use serde::{Deserialize, Serialize};

/// Role tag shared by user documents, JWT claims and the access-scoping
/// filter.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Staff,
    Student,
    Parent,
}

impl Role {
    /// Indicates whether users with this role can manage school records
    /// (classes, subjects, students, staffs, fees).
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    /// Indicates whether users with this role can publish announcements.
    pub fn can_announce(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Staff => write!(f, "Staff"),
            Role::Student => write!(f, "Student"),
            Role::Parent => write!(f, "Parent"),
        }
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.to_string()
    }
}
