pub mod claims;
pub mod config;
pub mod error;
pub mod guards;
pub mod inspector;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;

pub use claims::UnverifiedClaims;
pub use config::InspectorConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{
    authenticated_only, dashboard_for, kiosk_only, permission_gated, public_only, routes,
    super_admin_only, GuardDecision, GuardRejection,
};
pub use inspector::TokenInspector;
pub use permissions::{group_codes_by_module, module_of, PermissionMode, PermissionResolver};
pub use principal::{
    AccountState, KioskUserInfo, Principal, RegistrationStatus, SuperAdminInfo, TenantInfo,
    UserInfo,
};
pub use roles::{UserType, ROLE_EMPLOYEE, ROLE_KIOSK, ROLE_OWNER, ROLE_SUPER_ADMIN};
pub use session::{Session, SessionPhase};
