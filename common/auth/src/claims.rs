use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Claims decoded from a bearer token WITHOUT signature verification.
///
/// These are hints for client-side branching (which dashboard to show, when to
/// stop sending a dead token). The backend re-authorizes every call, so nothing
/// here may be used as a trust boundary.
#[derive(Debug, Clone, Serialize)]
pub struct UnverifiedClaims {
    pub subject: Option<String>,
    pub role: Option<String>,
    pub tenant_id: Option<String>,
    pub schema_name: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub raw: serde_json::Value,
}

impl UnverifiedClaims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_super_admin_hint(&self) -> bool {
        self.role.as_deref() == Some(crate::roles::ROLE_SUPER_ADMIN)
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    #[serde(default)]
    sub: Option<IdRepr>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    tenant_id: Option<IdRepr>,
    #[serde(default)]
    schema_name: Option<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
}

/// Backends disagree on whether ids are numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

impl IdRepr {
    fn into_string(self) -> String {
        match self {
            IdRepr::Text(value) => value,
            IdRepr::Number(value) => value.to_string(),
        }
    }
}

impl TryFrom<ClaimsRepr> for UnverifiedClaims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| AuthError::InvalidClaim("iat", iat.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            subject: value.sub.map(IdRepr::into_string),
            role: value.role,
            tenant_id: value.tenant_id.map(IdRepr::into_string),
            schema_name: value.schema_name,
            expires_at,
            issued_at,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for UnverifiedClaims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        let mut claims = UnverifiedClaims::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_are_stringified() {
        let claims = UnverifiedClaims::try_from(json!({
            "sub": 42,
            "tenant_id": 7,
            "role": "owner",
            "exp": 4_102_444_800i64
        }))
        .expect("claims");

        assert_eq!(claims.subject.as_deref(), Some("42"));
        assert_eq!(claims.tenant_id.as_deref(), Some("7"));
        assert_eq!(claims.role.as_deref(), Some("owner"));
        assert!(claims.issued_at.is_none());
    }

    #[test]
    fn missing_exp_is_rejected() {
        let err = UnverifiedClaims::try_from(json!({ "sub": "abc" })).expect_err("no exp");
        assert!(matches!(err, AuthError::InvalidJson(_)));
    }

    #[test]
    fn super_admin_hint_reads_role() {
        let claims = UnverifiedClaims::try_from(json!({
            "role": "super_admin",
            "exp": 4_102_444_800i64
        }))
        .expect("claims");
        assert!(claims.is_super_admin_hint());
    }
}
