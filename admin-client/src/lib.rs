pub mod config;
pub mod cooldown;
pub mod error;
pub mod events;
pub mod http;
pub mod metrics;
pub mod models;
pub mod resources;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use config::{load_client_config, ClientConfig};
pub use cooldown::ResendCooldown;
pub use error::{ClientError, ClientResult};
pub use events::{ClientEvent, EventBus, RedirectReason};
pub use http::{ApiClient, ApiRequest, Download, SCHEMA_HEADER, TENANT_HEADER};
pub use metrics::ClientMetrics;
pub use models::{
    ChangePasswordRequest, KioskLoginRequest, LoginRequest, MessageResponse, RegisterRequest,
    RegisterResponse, ResetPasswordRequest, ShiftSummary,
};
pub use resources::{
    group_by_module, AdminResource, AdminUser, AdminUserInput, ExportFormat, ListQuery, Page,
    Permission, Product, ProductInput, ResourceClient, Role, RoleInput, RolesClient, Unit,
    UnitInput,
};
pub use session::SessionManager;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, TokenStore};
pub use telemetry::init_tracing;
