use serde::{Deserialize, Serialize};

use crate::permissions::PermissionResolver;
use crate::principal::{Principal, TenantInfo};
use crate::roles::is_super_admin_role;

/// Coarse lifecycle state of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    SignedOut,
    Authenticating,
    SignedIn,
    MustChangePassword,
    KioskSignedIn,
}

/// Snapshot of the signed-in identity as the client knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub principal: Option<Principal>,
    pub tenant: Option<TenantInfo>,
    pub role: Option<String>,
    pub is_kiosk: bool,
    pub must_change_password: bool,
    pub is_authenticated: bool,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.is_authenticated {
            SessionPhase::SignedOut
        } else if self.is_kiosk {
            SessionPhase::KioskSignedIn
        } else if self.must_change_password {
            SessionPhase::MustChangePassword
        } else {
            SessionPhase::SignedIn
        }
    }

    pub fn is_super_admin(&self) -> bool {
        is_super_admin_role(self.role.as_deref())
    }

    pub fn permissions(&self) -> PermissionResolver<'_> {
        if !self.is_authenticated {
            return PermissionResolver::deny_all();
        }
        match &self.principal {
            Some(principal) => PermissionResolver::new(
                self.role.as_deref(),
                principal.permissions(),
                principal.is_owner(),
                principal.is_super_admin(),
            ),
            None => PermissionResolver::new(self.role.as_deref(), &[], false, false),
        }
    }
}
