use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::permissions::PermissionMode;
use crate::session::Session;

/// Console routes the guards redirect to.
pub mod routes {
    pub const LOGIN: &str = "/login";
    pub const CHANGE_PASSWORD: &str = "/change-password";
    pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
    pub const KIOSK_LOGIN: &str = "/kiosk/login";
    pub const KIOSK_DASHBOARD: &str = "/kiosk/dashboard";
    pub const SUPER_ADMIN_LOGIN: &str = "/super-admin/login";
    pub const SUPER_ADMIN_DASHBOARD: &str = "/super-admin/dashboard";
    pub const SUPER_ADMIN_CHANGE_PASSWORD: &str = "/super-admin/change-password";
}

/// Outcome of evaluating a guard for the current navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(&'static str),
    /// Render the in-page "not authorized" view; never a redirect.
    Forbidden {
        required: Vec<String>,
        mode: PermissionMode,
    },
}

impl GuardDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardDecision::Render)
    }

    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GuardDecision::Redirect(target) => Some(*target),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<(), GuardRejection> {
        match self {
            GuardDecision::Render => Ok(()),
            GuardDecision::Redirect(target) => Err(GuardRejection::Redirect(target)),
            GuardDecision::Forbidden { required, mode } => {
                Err(GuardRejection::Forbidden { required, mode })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    Redirect(&'static str),
    Forbidden {
        required: Vec<String>,
        mode: PermissionMode,
    },
}

#[derive(Debug, Serialize)]
struct ForbiddenBody {
    code: &'static str,
    message: String,
    required: Vec<String>,
    mode: PermissionMode,
}

fn forbidden_message(required: &[String], mode: PermissionMode) -> String {
    if required.is_empty() {
        return "You do not have permission to view this page".to_string();
    }
    let joiner = match mode {
        PermissionMode::Any => "one of",
        PermissionMode::All => "all of",
    };
    format!(
        "You do not have permission to view this page. Required {joiner}: {}",
        required.join(", ")
    )
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            GuardRejection::Redirect(target) => Redirect::to(target).into_response(),
            GuardRejection::Forbidden { required, mode } => {
                let body = ForbiddenBody {
                    code: "FORBIDDEN",
                    message: forbidden_message(&required, mode),
                    required,
                    mode,
                };
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            }
        }
    }
}

impl From<GuardRejection> for (StatusCode, String) {
    fn from(value: GuardRejection) -> Self {
        match value {
            GuardRejection::Redirect(target) => (StatusCode::SEE_OTHER, target.to_string()),
            GuardRejection::Forbidden { required, mode } => {
                (StatusCode::FORBIDDEN, forbidden_message(&required, mode))
            }
        }
    }
}

/// Landing page for an authenticated session.
pub fn dashboard_for(session: &Session) -> &'static str {
    if session.is_kiosk {
        routes::KIOSK_DASHBOARD
    } else if session.is_super_admin() {
        routes::SUPER_ADMIN_DASHBOARD
    } else {
        routes::ADMIN_DASHBOARD
    }
}

/// Login, registration and password-reset pages.
pub fn public_only(session: &Session) -> GuardDecision {
    if session.is_authenticated {
        return GuardDecision::Redirect(dashboard_for(session));
    }
    GuardDecision::Render
}

/// Tenant console pages.
pub fn authenticated_only(session: &Session, current_path: &str) -> GuardDecision {
    if !session.is_authenticated {
        return GuardDecision::Redirect(routes::LOGIN);
    }
    if session.is_super_admin() {
        return GuardDecision::Redirect(routes::SUPER_ADMIN_DASHBOARD);
    }
    if session.must_change_password && current_path != routes::CHANGE_PASSWORD {
        return GuardDecision::Redirect(routes::CHANGE_PASSWORD);
    }
    if session.is_kiosk {
        return GuardDecision::Redirect(routes::KIOSK_DASHBOARD);
    }
    GuardDecision::Render
}

pub fn super_admin_only(session: &Session, current_path: &str) -> GuardDecision {
    if !session.is_authenticated {
        return GuardDecision::Redirect(routes::SUPER_ADMIN_LOGIN);
    }
    if !session.is_super_admin() {
        return GuardDecision::Redirect(routes::ADMIN_DASHBOARD);
    }
    if session.must_change_password && current_path != routes::SUPER_ADMIN_CHANGE_PASSWORD {
        return GuardDecision::Redirect(routes::SUPER_ADMIN_CHANGE_PASSWORD);
    }
    GuardDecision::Render
}

pub fn kiosk_only(session: &Session) -> GuardDecision {
    if !session.is_authenticated {
        return GuardDecision::Redirect(routes::KIOSK_LOGIN);
    }
    if !session.is_kiosk {
        return GuardDecision::Redirect(routes::ADMIN_DASHBOARD);
    }
    GuardDecision::Render
}

/// Tenant console page that additionally requires permissions.
pub fn permission_gated<S: AsRef<str>>(
    session: &Session,
    current_path: &str,
    required: &[S],
    mode: PermissionMode,
) -> GuardDecision {
    let outer = authenticated_only(session, current_path);
    if !outer.is_render() {
        return outer;
    }

    if session.permissions().check(required, mode) {
        return GuardDecision::Render;
    }

    let required: Vec<String> = required.iter().map(|code| code.as_ref().to_string()).collect();
    debug!(path = current_path, ?required, ?mode, "permission gate denied");
    GuardDecision::Forbidden { required, mode }
}
