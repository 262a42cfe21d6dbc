use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_auth::{KioskUserInfo, SuperAdminInfo, TenantInfo, UserInfo};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ClientError::Validation("Password is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    pub user: UserInfo,
    #[serde(default)]
    pub tenant: Option<TenantInfo>,
    #[serde(default)]
    pub must_change_password: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperAdminLoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(alias = "user")]
    pub admin: SuperAdminInfo,
    #[serde(default)]
    pub must_change_password: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskLoginRequest {
    pub user_id: String,
    pub pin: String,
}

impl KioskLoginRequest {
    pub fn new(user_id: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            pin: pin.into(),
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(ClientError::Validation("Employee ID is required".into()));
        }
        let pin_ok =
            (4..=6).contains(&self.pin.len()) && self.pin.chars().all(|c| c.is_ascii_digit());
        if !pin_ok {
            return Err(ClientError::Validation("PIN must be 4 to 6 digits".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KioskLoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    pub user: KioskUserInfo,
    #[serde(default)]
    pub tenant: Option<TenantInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub shop_name: String,
    pub business_type: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> ClientResult<()> {
        if self.shop_name.trim().is_empty() {
            return Err(ClientError::Validation("Shop name is required".into()));
        }
        if self.full_name.trim().is_empty() {
            return Err(ClientError::Validation("Full name is required".into()));
        }
        validate_email(&self.email)?;
        validate_new_password(&self.password)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tenant: Option<TenantInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> ClientResult<()> {
        if self.current_password.is_empty() {
            return Err(ClientError::Validation("Current password is required".into()));
        }
        validate_new_password(&self.new_password)?;
        if self.new_password == self.current_password {
            return Err(ClientError::Validation(
                "New password must differ from the current password".into(),
            ));
        }
        Ok(())
    }
}

/// Backend acknowledgement for fire-and-confirm calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// End-of-shift totals shown before a kiosk signs out.
#[derive(Debug, Clone, Deserialize)]
pub struct ShiftSummary {
    #[serde(default)]
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub clock_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transaction_count: u64,
    #[serde(default)]
    pub total_sales: Option<BigDecimal>,
}

pub(crate) fn validate_email(email: &str) -> ClientResult<()> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ClientError::Validation("A valid email address is required".into()))
    }
}

pub(crate) fn validate_new_password(password: &str) -> ClientResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
