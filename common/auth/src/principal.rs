use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::UserType;

/// Tenant user (owner or employee) signed in through the regular login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub user_type: UserType,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub kiosk_enabled: bool,
    #[serde(default)]
    pub role_id: Option<Uuid>,
    #[serde(default)]
    pub role_name: Option<String>,
    /// Snapshot taken at login; not refreshed until the next login.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Employee signed in at a kiosk with an employee code and PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KioskUserInfo {
    pub id: Uuid,
    /// Employee code typed on the keypad, e.g. `EMP001`.
    pub user_id: String,
    pub full_name: String,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Platform operator; not bound to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperAdminInfo {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// Whoever holds the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Regular(UserInfo),
    Kiosk(KioskUserInfo),
    SuperAdmin(SuperAdminInfo),
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Regular(user) => user.id,
            Principal::Kiosk(user) => user.id,
            Principal::SuperAdmin(admin) => admin.id,
        }
    }

    pub fn full_name(&self) -> &str {
        match self {
            Principal::Regular(user) => &user.full_name,
            Principal::Kiosk(user) => &user.full_name,
            Principal::SuperAdmin(admin) => &admin.full_name,
        }
    }

    pub fn permissions(&self) -> &[String] {
        match self {
            Principal::Regular(user) => &user.permissions,
            Principal::Kiosk(user) => &user.permissions,
            Principal::SuperAdmin(_) => &[],
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Principal::Regular(user) if user.user_type == UserType::Owner)
    }

    pub fn is_super_admin(&self) -> bool {
        match self {
            Principal::Regular(user) => user.is_super_admin,
            Principal::Kiosk(_) => false,
            Principal::SuperAdmin(_) => true,
        }
    }
}

/// Business context a tenant user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub id: Uuid,
    pub shop_name: String,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    pub registration_status: RegistrationStatus,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active,
    Pending,
    Rejected,
    Suspended,
    #[serde(other)]
    Inactive,
}

impl RegistrationStatus {
    /// Login gate: only active tenants may sign in.
    pub fn gate(self) -> Result<(), AccountState> {
        match self {
            RegistrationStatus::Active => Ok(()),
            RegistrationStatus::Pending => Err(AccountState::Pending),
            RegistrationStatus::Rejected => Err(AccountState::Rejected),
            RegistrationStatus::Suspended => Err(AccountState::Suspended),
            RegistrationStatus::Inactive => Err(AccountState::Inactive),
        }
    }
}

/// Reasons a tenant account may not sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    Pending,
    Rejected,
    Suspended,
    Inactive,
}

impl AccountState {
    pub fn code(&self) -> &'static str {
        match self {
            AccountState::Pending => "ACCOUNT_PENDING",
            AccountState::Rejected => "ACCOUNT_REJECTED",
            AccountState::Suspended => "ACCOUNT_SUSPENDED",
            AccountState::Inactive => "ACCOUNT_INACTIVE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ACCOUNT_PENDING" => Some(AccountState::Pending),
            "ACCOUNT_REJECTED" => Some(AccountState::Rejected),
            "ACCOUNT_SUSPENDED" => Some(AccountState::Suspended),
            "ACCOUNT_INACTIVE" => Some(AccountState::Inactive),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AccountState::Pending => {
                "Your account is pending approval. You will receive an email once it has been reviewed."
            }
            AccountState::Rejected => {
                "Your registration was rejected. Please contact support for more information."
            }
            AccountState::Suspended => {
                "Your account has been suspended. Please contact support to restore access."
            }
            AccountState::Inactive => {
                "Your account is inactive. Please contact support to reactivate it."
            }
        }
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
