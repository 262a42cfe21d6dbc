use std::time::Duration;

use chrono::{DateTime, Utc};
use common_auth::AccountState;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

const LOCKED_MESSAGE: &str = "This account is locked. Please contact a manager for assistance.";

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any request was sent.
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    InvalidCredentials { message: String },
    #[error("{0}")]
    Account(AccountState),
    #[error("{message}")]
    AccountLocked {
        message: String,
        locked_until: Option<DateTime<Utc>>,
    },
    /// The refresh attempt failed; local session state has been cleared.
    #[error("your session has expired, please sign in again")]
    SessionExpired,
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    Forbidden { message: String },
    #[error("{message}")]
    NotFound { message: String },
    #[error("too many requests")]
    RateLimited { retry_after: Option<Duration> },
    #[error("{message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("session storage error: {0}")]
    Storage(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("client setup failed: {0}")]
    Setup(String),
    #[error("please wait {} seconds before trying again", .remaining.as_secs().max(1))]
    CooldownActive { remaining: Duration },
}

impl ClientError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation",
            ClientError::InvalidCredentials { .. } => "invalid_credentials",
            ClientError::Account(AccountState::Pending) => "account_pending",
            ClientError::Account(AccountState::Rejected) => "account_rejected",
            ClientError::Account(AccountState::Suspended) => "account_suspended",
            ClientError::Account(AccountState::Inactive) => "account_inactive",
            ClientError::AccountLocked { .. } => "account_locked",
            ClientError::SessionExpired | ClientError::Unauthorized { .. } => "authentication",
            ClientError::Forbidden { .. } => "authorization",
            ClientError::NotFound { .. } => "not_found",
            ClientError::RateLimited { .. } => "rate_limited",
            ClientError::Server { .. } | ClientError::Network(_) | ClientError::Decode(_) => {
                "network_or_server"
            }
            ClientError::Storage(_) => "storage",
            ClientError::Cancelled => "cancelled",
            ClientError::Setup(_) => "setup",
            ClientError::CooldownActive { .. } => "cooldown",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::InvalidCredentials { .. } | ClientError::Unauthorized { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::AccountLocked { .. } => Some(423),
            ClientError::RateLimited { .. } => Some(429),
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a form should disable its submit control after this error.
    pub fn disables_submit(&self) -> bool {
        matches!(
            self,
            ClientError::AccountLocked { .. }
                | ClientError::RateLimited { .. }
                | ClientError::CooldownActive { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ClientError::Account(state) => state.message().to_string(),
            other => other.to_string(),
        }
    }

    /// On credential endpoints a 401 means bad credentials, not an expired session.
    pub(crate) fn into_login_error(self) -> Self {
        match self {
            ClientError::Unauthorized { message } => ClientError::InvalidCredentials { message },
            other => other,
        }
    }

    pub(crate) fn from_response(
        status: StatusCode,
        body: &[u8],
        retry_after: Option<Duration>,
    ) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let code = parsed.code.clone();

        if let Some(state) = code.as_deref().and_then(AccountState::from_code) {
            return ClientError::Account(state);
        }

        let locked = status == StatusCode::LOCKED
            || code.as_deref().map(|c| c.eq_ignore_ascii_case("ACCOUNT_LOCKED")) == Some(true);
        if locked {
            return ClientError::AccountLocked {
                message: parsed.message().unwrap_or_else(|| LOCKED_MESSAGE.to_string()),
                locked_until: parsed.locked_until,
            };
        }

        let message = parsed.message().unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED => {
                if code.as_deref() == Some("INVALID_CREDENTIALS") {
                    ClientError::InvalidCredentials { message }
                } else {
                    ClientError::Unauthorized { message }
                }
            }
            StatusCode::FORBIDDEN => ClientError::Forbidden { message },
            StatusCode::NOT_FOUND => ClientError::NotFound { message },
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
                retry_after: retry_after.or(parsed.retry_after.map(Duration::from_secs)),
            },
            _ => ClientError::Server {
                status: status.as_u16(),
                code,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    retry_after: Option<u64>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        [&self.message, &self.detail, &self.error]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }
}
