use std::sync::{Arc, RwLock};

use common_auth::{
    routes, GuardDecision, InspectorConfig, Principal, Session, SessionPhase, TenantInfo,
    TokenInspector, ROLE_KIOSK, ROLE_SUPER_ADMIN,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::cooldown::ResendCooldown;
use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEvent, EventBus, RedirectReason};
use crate::http::{read_json_or_default, ApiClient, ApiRequest};
use crate::metrics::ClientMetrics;
use crate::models::{
    validate_email, validate_new_password, ChangePasswordRequest, KioskLoginRequest,
    KioskLoginResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    RegisterResponse, ResetPasswordRequest, ShiftSummary, SuperAdminLoginResponse,
};
use crate::storage::{FileStorage, MemoryStorage, SessionStorage, TokenStore};

const FLOW_REGULAR: &str = "regular";
const FLOW_SUPER_ADMIN: &str = "super_admin";
const FLOW_KIOSK: &str = "kiosk";

#[derive(Debug, Default)]
struct SessionState {
    session: Session,
    authenticating: bool,
}

/// Owns the client session: login flows, logout, and the durable copy.
///
/// Construct one per application and hand it to whatever needs the session;
/// there is no ambient global.
pub struct SessionManager {
    api: Arc<ApiClient>,
    store: TokenStore,
    state: RwLock<SessionState>,
    resend_cooldown: ResendCooldown,
}

impl SessionManager {
    /// Build from config, picking file storage when a session file is configured.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let storage: Arc<dyn SessionStorage> = match &config.session_file {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(
        config: &ClientConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> ClientResult<Self> {
        let inspector = TokenInspector::new(
            InspectorConfig::new().with_leeway(config.token_leeway_seconds),
        );
        let store = TokenStore::new(storage, inspector);
        let metrics = ClientMetrics::new().map_err(|err| ClientError::Setup(err.to_string()))?;
        let api = ApiClient::new(config, store.clone(), EventBus::new(), metrics)?;

        let manager = Self {
            api: Arc::new(api),
            store,
            state: RwLock::new(SessionState::default()),
            resend_cooldown: ResendCooldown::new(config.resend_cooldown),
        };
        manager.restore();
        Ok(manager)
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn metrics(&self) -> &ClientMetrics {
        self.api.metrics()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.api.events().subscribe()
    }

    /// Rebuild the in-memory session from durable storage.
    pub fn restore(&self) -> Session {
        let session = self.store.load_session().unwrap_or_else(|err| {
            warn!(error = %err, "failed to restore session; starting signed out");
            Session::signed_out()
        });
        let mut state = self.state.write().expect("rwlock poisoned");
        state.session = session.clone();
        session
    }

    /// Current session. The access token is re-read from storage so a
    /// background refresh is visible.
    pub fn session(&self) -> Session {
        let mut session = self.state.read().expect("rwlock poisoned").session.clone();
        if session.is_authenticated {
            match self.store.token() {
                Some(token) => session.access_token = Some(token),
                None => return self.restore(),
            }
        }
        session
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.state.read().expect("rwlock poisoned");
        if state.authenticating {
            SessionPhase::Authenticating
        } else {
            state.session.phase()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.session().permissions().has_permission(code)
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.session().permissions().has_any_permission(codes)
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.session().permissions().has_all_permissions(codes)
    }

    /// Evaluate a route guard against the current session.
    pub fn evaluate<F>(&self, guard: F) -> GuardDecision
    where
        F: FnOnce(&Session) -> GuardDecision,
    {
        guard(&self.session())
    }

    pub async fn login(&self, credentials: LoginRequest) -> ClientResult<Session> {
        credentials.validate()?;
        let _authenticating = self.begin_authenticating();

        let request = ApiRequest::post("auth/login")
            .json(&credentials)?
            .without_refresh();
        let response: LoginResponse = self.call_login(FLOW_REGULAR, &request).await?;

        if let Some(tenant) = &response.tenant {
            self.gate_tenant(FLOW_REGULAR, tenant)?;
        }

        let role = if response.user.is_super_admin {
            ROLE_SUPER_ADMIN.to_string()
        } else {
            response.user.user_type.as_str().to_string()
        };
        let session = Session {
            access_token: Some(response.access_token),
            principal: Some(Principal::Regular(response.user)),
            tenant: response.tenant,
            role: Some(role),
            is_kiosk: false,
            must_change_password: response.must_change_password,
            is_authenticated: true,
        };
        self.establish(FLOW_REGULAR, session)
    }

    pub async fn super_admin_login(&self, credentials: LoginRequest) -> ClientResult<Session> {
        credentials.validate()?;
        let _authenticating = self.begin_authenticating();

        let request = ApiRequest::post("auth/super-admin-login")
            .json(&credentials)?
            .without_refresh();
        let response: SuperAdminLoginResponse =
            self.call_login(FLOW_SUPER_ADMIN, &request).await?;

        let session = Session {
            access_token: Some(response.access_token),
            principal: Some(Principal::SuperAdmin(response.admin)),
            tenant: None,
            role: Some(ROLE_SUPER_ADMIN.to_string()),
            is_kiosk: false,
            must_change_password: response.must_change_password,
            is_authenticated: true,
        };
        self.establish(FLOW_SUPER_ADMIN, session)
    }

    /// Kiosk sessions replace any regular session wholesale.
    pub async fn kiosk_login(&self, credentials: KioskLoginRequest) -> ClientResult<Session> {
        credentials.validate()?;
        let _authenticating = self.begin_authenticating();

        let request = ApiRequest::post("auth/kiosk-login")
            .json(&credentials)?
            .without_refresh();
        let response: KioskLoginResponse = self.call_login(FLOW_KIOSK, &request).await?;

        if let Some(tenant) = &response.tenant {
            self.gate_tenant(FLOW_KIOSK, tenant)?;
        }

        let session = Session {
            access_token: Some(response.access_token),
            principal: Some(Principal::Kiosk(response.user)),
            tenant: response.tenant,
            role: Some(ROLE_KIOSK.to_string()),
            is_kiosk: true,
            must_change_password: false,
            is_authenticated: true,
        };
        self.establish(FLOW_KIOSK, session)
    }

    /// Registration needs out-of-band approval, so no session is created.
    pub async fn register(&self, data: RegisterRequest) -> ClientResult<RegisterResponse> {
        data.validate()?;
        let request = ApiRequest::post("auth/register").json(&data)?.without_refresh();
        let response: RegisterResponse = self.api.json_or_default(&request).await?;
        info!(shop = %data.shop_name, "tenant registration submitted");
        Ok(response)
    }

    /// Always ends signed out. Backend failures are logged, never returned.
    pub async fn logout(&self) {
        if self.store.token().is_some() {
            let request = ApiRequest::post("auth/logout").without_refresh();
            if let Err(err) = self.api.send(&request).await {
                warn!(error = %err, "backend logout failed; clearing local session anyway");
            }
        }

        if let Err(err) = self.store.clear_session() {
            warn!(error = %err, "failed to clear session storage");
        }
        {
            let mut state = self.state.write().expect("rwlock poisoned");
            state.session = Session::signed_out();
            state.authenticating = false;
        }
        self.api.events().emit(ClientEvent::Redirect {
            to: routes::LOGIN,
            reason: RedirectReason::LoggedOut,
        });
    }

    /// Kiosk only: fetch the shift summary, then sign out whatever happened.
    pub async fn end_shift(&self) -> ClientResult<ShiftSummary> {
        if !self.session().is_kiosk {
            return Err(ClientError::Validation(
                "Ending a shift requires a kiosk session".into(),
            ));
        }

        let summary = self
            .api
            .json::<ShiftSummary>(&ApiRequest::get("kiosk/shift-summary"))
            .await;
        if let Err(err) = &summary {
            warn!(error = %err, "shift summary unavailable; signing out");
        }
        self.logout().await;
        summary
    }

    pub async fn forgot_password(&self, email: &str) -> ClientResult<MessageResponse> {
        validate_email(email)?;
        let request = ApiRequest::post("auth/forgot-password")
            .json(&serde_json::json!({ "email": email.trim() }))?
            .without_refresh();
        self.api.json_or_default(&request).await
    }

    pub async fn reset_password(
        &self,
        data: ResetPasswordRequest,
    ) -> ClientResult<MessageResponse> {
        if data.token.trim().is_empty() {
            return Err(ClientError::Validation(
                "Reset link is invalid or incomplete".into(),
            ));
        }
        validate_new_password(&data.new_password)?;
        let request = ApiRequest::post("auth/reset-password")
            .json(&data)?
            .without_refresh();
        self.api.json_or_default(&request).await
    }

    /// Clears the must-change-password flag on success.
    pub async fn change_password(&self, data: ChangePasswordRequest) -> ClientResult<()> {
        data.validate()?;
        let request = ApiRequest::post("auth/change-password").json(&data)?;
        self.api.send(&request).await?;

        self.store.set_must_change_password(false)?;
        let mut state = self.state.write().expect("rwlock poisoned");
        state.session.must_change_password = false;
        info!("password changed");
        Ok(())
    }

    /// Resend the verification email, at most once per cooldown window.
    ///
    /// The window is released only when the backend did not accept the request.
    pub async fn resend_verification(&self, email: &str) -> ClientResult<MessageResponse> {
        validate_email(email)?;
        self.resend_cooldown
            .try_start()
            .map_err(|remaining| ClientError::CooldownActive { remaining })?;

        let request = ApiRequest::post("auth/resend-verification")
            .json(&serde_json::json!({ "email": email.trim() }))?
            .without_refresh();
        let response = match self.api.execute(&request).await {
            Ok(response) => response,
            Err(err) => {
                self.resend_cooldown.reset();
                return Err(err);
            }
        };
        read_json_or_default(response).await
    }

    pub fn resend_cooldown(&self) -> &ResendCooldown {
        &self.resend_cooldown
    }

    async fn call_login<T: serde::de::DeserializeOwned>(
        &self,
        flow: &'static str,
        request: &ApiRequest,
    ) -> ClientResult<T> {
        match self.api.json::<T>(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                let err = err.into_login_error();
                self.metrics().login_attempt(flow, err.kind());
                warn!(flow, kind = err.kind(), "login rejected");
                Err(err)
            }
        }
    }

    fn gate_tenant(&self, flow: &'static str, tenant: &TenantInfo) -> ClientResult<()> {
        tenant.registration_status.gate().map_err(|state| {
            let err = ClientError::Account(state);
            self.metrics().login_attempt(flow, err.kind());
            info!(flow, tenant_id = %tenant.id, code = state.code(), "login blocked by account state");
            err
        })
    }

    fn establish(&self, flow: &'static str, session: Session) -> ClientResult<Session> {
        self.store.set_session(&session)?;
        {
            let mut state = self.state.write().expect("rwlock poisoned");
            state.session = session.clone();
        }
        self.metrics().login_attempt(flow, "success");
        if let Some(principal) = &session.principal {
            info!(flow, principal_id = %principal.id(), phase = ?session.phase(), "session established");
        }
        Ok(session)
    }

    fn begin_authenticating(&self) -> AuthenticatingGuard<'_> {
        self.state.write().expect("rwlock poisoned").authenticating = true;
        AuthenticatingGuard { state: &self.state }
    }
}

/// Clears the authenticating flag however the login future ends.
struct AuthenticatingGuard<'a> {
    state: &'a RwLock<SessionState>,
}

impl Drop for AuthenticatingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.write() {
            state.authenticating = false;
        }
    }
}
