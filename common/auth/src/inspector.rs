use chrono::{Duration, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::UnverifiedClaims;
use crate::config::InspectorConfig;
use crate::error::{AuthError, AuthResult};

/// Decodes bearer tokens for client-side branching.
///
/// The signature is never checked: the inspector has no key material and the
/// backend is the only party that can vouch for a token.
#[derive(Debug, Clone, Default)]
pub struct TokenInspector {
    config: InspectorConfig,
}

impl TokenInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Decode the payload, ignoring expiry.
    pub fn decode(&self, token: &str) -> AuthResult<UnverifiedClaims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Value>(token, &DecodingKey::from_secret(&[]), &validation)?;
        UnverifiedClaims::try_from(data.claims)
    }

    /// Decode the payload and reject it when `exp` has passed (minus leeway).
    pub fn inspect(&self, token: &str) -> AuthResult<UnverifiedClaims> {
        let claims = self.decode(token)?;
        let horizon = Utc::now() + Duration::seconds(i64::from(self.config.leeway_seconds));
        if claims.is_expired_at(horizon) {
            debug!(expires_at = %claims.expires_at, "token past expiry");
            return Err(AuthError::Expired(claims.expires_at));
        }
        Ok(claims)
    }

    pub fn is_usable(&self, token: &str) -> bool {
        self.inspect(token).is_ok()
    }
}
