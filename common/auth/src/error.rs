use chrono::{DateTime, Utc};
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is empty")]
    EmptyToken,
    #[error("failed to decode token: {0}")]
    Malformed(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}
