use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Url,
    /// Durable session file. `None` keeps the session in memory only.
    pub session_file: Option<PathBuf>,
    pub request_timeout: Duration,
    pub resend_cooldown: Duration,
    pub token_leeway_seconds: u32,
    pub send_tenant_headers: bool,
}

impl ClientConfig {
    pub fn new(api_base_url: &str) -> Result<Self> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            session_file: None,
            request_timeout: Duration::from_secs(30),
            resend_cooldown: Duration::from_secs(60),
            token_leeway_seconds: 0,
            send_tenant_headers: true,
        })
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    pub fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }
}

pub fn load_client_config() -> Result<ClientConfig> {
    let base = env::var("ADMIN_API_BASE_URL")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let mut config = ClientConfig::new(&base).context("Failed to parse ADMIN_API_BASE_URL")?;

    config.session_file = env::var("ADMIN_SESSION_FILE")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .map(PathBuf::from);

    if let Some(secs) = u64_from_env("ADMIN_HTTP_TIMEOUT_SECS")
        .context("Failed to parse ADMIN_HTTP_TIMEOUT_SECS")?
    {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = u64_from_env("ADMIN_RESEND_COOLDOWN_SECS")
        .context("Failed to parse ADMIN_RESEND_COOLDOWN_SECS")?
    {
        config.resend_cooldown = Duration::from_secs(secs);
    }
    if let Some(secs) = u64_from_env("ADMIN_TOKEN_LEEWAY_SECS")
        .context("Failed to parse ADMIN_TOKEN_LEEWAY_SECS")?
    {
        config.token_leeway_seconds = u32::try_from(secs)
            .map_err(|_| anyhow!("ADMIN_TOKEN_LEEWAY_SECS out of range: {secs}"))?;
    }
    config.send_tenant_headers = bool_from_env("ADMIN_SEND_TENANT_HEADERS").unwrap_or(true);

    Ok(config)
}

/// Base URLs are joined with relative endpoint paths, so they must end in `/`.
fn parse_base_url(value: &str) -> Result<Url> {
    let trimmed = value.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|err| anyhow!("Invalid API base URL '{trimmed}': {err}"))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("API base URL '{trimmed}' cannot be used as a base"));
    }
    Ok(url)
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn u64_from_env(key: &str) -> Result<Option<u64>> {
    match env::var(key).ok().and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| anyhow!("Invalid number '{value}': {err}")),
        None => Ok(None),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
