use serde::{Deserialize, Serialize};

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_EMPLOYEE: &str = "employee";
pub const ROLE_KIOSK: &str = "kiosk";

/// Account type of a tenant user as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Owner,
    #[serde(other)]
    Employee,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Owner => ROLE_OWNER,
            UserType::Employee => ROLE_EMPLOYEE,
        }
    }
}

pub fn is_super_admin_role(role: Option<&str>) -> bool {
    role == Some(ROLE_SUPER_ADMIN)
}
