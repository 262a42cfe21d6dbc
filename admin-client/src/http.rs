use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common_auth::routes;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEvent, EventBus, RedirectReason};
use crate::metrics::ClientMetrics;
use crate::storage::TokenStore;

pub const TENANT_HEADER: &str = "X-Tenant-ID";
pub const SCHEMA_HEADER: &str = "X-Schema-Name";

const REFRESH_PATH: &str = "auth/refresh-token";

/// Replayable description of a backend call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    refresh_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Credential endpoints: a 401 is an answer, not an expired session.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Binary payload such as a PDF or spreadsheet export.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "token")]
    access_token: String,
}

/// HTTP wrapper that attaches the session to every call.
///
/// A 401 triggers at most one refresh per request followed by a single
/// replay. Refreshes are single-flight: a request whose token was already
/// rotated by a concurrent refresh replays with the new token instead of
/// refreshing again.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    store: TokenStore,
    events: EventBus,
    metrics: ClientMetrics,
    send_tenant_headers: bool,
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: TokenStore,
        events: EventBus,
        metrics: ClientMetrics,
    ) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| ClientError::Setup(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            store,
            events,
            metrics,
            send_tenant_headers: config.send_tenant_headers,
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<Response> {
        let sent_token = self.store.token();
        let response = self.dispatch(request, sent_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.refresh_on_unauthorized {
            return self.check(response).await;
        }

        debug!(path = %request.path, "401 received; refreshing access token");
        let token = self.refresh_after_unauthorized(sent_token.as_deref()).await?;
        let replayed = self.dispatch(request, Some(&token)).await?;
        self.check(replayed).await
    }

    pub async fn execute_with(
        &self,
        request: &ApiRequest,
        cancel: Option<&CancellationToken>,
    ) -> ClientResult<Response> {
        cancellable(cancel, self.execute(request)).await
    }

    /// Send and discard the response body.
    pub async fn send(&self, request: &ApiRequest) -> ClientResult<()> {
        self.execute(request).await.map(|_| ())
    }

    pub async fn json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ClientResult<T> {
        self.json_with(request, None).await
    }

    pub async fn json_with<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: Option<&CancellationToken>,
    ) -> ClientResult<T> {
        cancellable(cancel, async {
            let response = self.execute(request).await?;
            let bytes = response.bytes().await?;
            decode_body(&bytes)
        })
        .await
    }

    /// For acknowledgement bodies: an empty 2xx body (e.g. 204) yields `T::default()`.
    pub async fn json_or_default<T: DeserializeOwned + Default>(
        &self,
        request: &ApiRequest,
    ) -> ClientResult<T> {
        let response = self.execute(request).await?;
        read_json_or_default(response).await
    }

    pub async fn download(
        &self,
        request: &ApiRequest,
        cancel: Option<&CancellationToken>,
    ) -> ClientResult<Download> {
        cancellable(cancel, async {
            let response = self.execute(request).await?;
            let content_type = header_string(response.headers(), CONTENT_TYPE.as_str());
            let filename = header_string(response.headers(), CONTENT_DISPOSITION.as_str())
                .and_then(|value| filename_from_disposition(&value));
            let bytes = response.bytes().await?.to_vec();
            Ok(Download {
                bytes,
                content_type,
                filename,
            })
        })
        .await
    }

    /// Explicit refresh, outside the 401 path.
    pub async fn refresh_token(&self) -> ClientResult<String> {
        let stale = self.store.token();
        let _gate = self.refresh_gate.lock().await;
        self.rotate(stale.as_deref()).await
    }

    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> ClientResult<String> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.store.token() {
            if Some(current.as_str()) != stale {
                debug!("token already rotated by a concurrent refresh");
                return Ok(current);
            }
        }

        self.rotate(stale).await
    }

    /// Caller holds `refresh_gate`.
    async fn rotate(&self, stale: Option<&str>) -> ClientResult<String> {
        match self.request_new_token(stale).await {
            Ok(token) => {
                self.store.set_token(&token)?;
                self.metrics.token_refresh("success");
                info!("access token refreshed");
                Ok(token)
            }
            Err(err) => {
                self.metrics.token_refresh("failure");
                warn!(error = %err, "token refresh failed; clearing session");
                if let Err(clear_err) = self.store.clear_session() {
                    warn!(error = %clear_err, "failed to clear session storage");
                }
                self.events.emit(ClientEvent::Redirect {
                    to: routes::LOGIN,
                    reason: RedirectReason::SessionExpired,
                });
                Err(ClientError::SessionExpired)
            }
        }
    }

    async fn request_new_token(&self, stale: Option<&str>) -> ClientResult<String> {
        let request = ApiRequest::post(REFRESH_PATH).without_refresh();
        let response = self.dispatch(&request, stale).await?;
        let response = self.check(response).await?;
        let bytes = response.bytes().await?;
        let body: RefreshResponse = decode_body(&bytes)?;
        if body.access_token.trim().is_empty() {
            return Err(ClientError::Decode("refresh returned an empty token".into()));
        }
        Ok(body.access_token)
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> ClientResult<Response> {
        let url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|err| {
                ClientError::Validation(format!("invalid endpoint '{}': {err}", request.path))
            })?;

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if self.send_tenant_headers {
            if let Some(tenant) = self.store.tenant() {
                builder = builder.header(TENANT_HEADER, tenant.id.to_string());
                if let Some(schema) = tenant.schema_name {
                    builder = builder.header(SCHEMA_HEADER, schema);
                }
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    async fn check(&self, response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after_hint(response.headers());
        let body = response.bytes().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS {
            self.metrics.rate_limited();
            warn!(?retry_after, "rate limited by backend");
            self.events.emit(ClientEvent::RateLimited { retry_after });
            return Err(ClientError::RateLimited { retry_after });
        }

        Err(ClientError::from_response(status, &body, retry_after))
    }
}

async fn cancellable<T, F>(cancel: Option<&CancellationToken>, work: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match cancel {
        Some(cancel) => tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = work => result,
        },
        None => work.await,
    }
}

pub(crate) async fn read_json_or_default<T: DeserializeOwned + Default>(
    response: Response,
) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    decode_body_or_default(&bytes)
}

fn decode_body_or_default<T: DeserializeOwned + Default>(bytes: &[u8]) -> ClientResult<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    decode_body(bytes)
}

/// Accepts a `{ "data": ... }` envelope or the bare document. Paged bodies
/// carry their own `data` array, so the envelope is tried first and the
/// whole document is the fallback.
fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> ClientResult<T> {
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes)?
    };

    if let Some(inner) = value.get("data") {
        if let Ok(decoded) = serde_json::from_value::<T>(inner.clone()) {
            return Ok(decoded);
        }
    }
    Ok(serde_json::from_value(value)?)
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Retry-After` as delta-seconds or an HTTP date.
fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    let raw = header_string(headers, RETRY_AFTER.as_str())?;
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(&raw).ok()?.with_timezone(&Utc);
    (at - Utc::now()).to_std().ok().or(Some(Duration::ZERO))
}

fn filename_from_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_seconds_and_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(120)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_hint(&headers), Some(Duration::ZERO));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after_hint(&headers), None);
    }

    #[test]
    fn decode_body_unwraps_data_envelope() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: u32,
        }

        let bare: Item = decode_body(br#"{"id": 1}"#).expect("bare");
        assert_eq!(bare, Item { id: 1 });

        let wrapped: Item =
            decode_body(br#"{"success": true, "data": {"id": 2}}"#).expect("wrapped");
        assert_eq!(wrapped, Item { id: 2 });

        assert!(decode_body::<Item>(br#"{"nope": true}"#).is_err());
    }

    #[test]
    fn empty_acknowledgement_body_is_default() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        struct Ack {
            #[serde(default)]
            message: Option<String>,
        }

        assert_eq!(decode_body_or_default::<Ack>(b"").expect("empty"), Ack::default());
        assert_eq!(decode_body_or_default::<Ack>(b" \n").expect("blank"), Ack::default());
        let ack: Ack = decode_body_or_default(br#"{"message": "sent"}"#).expect("ack");
        assert_eq!(ack.message.as_deref(), Some("sent"));
        assert!(decode_body::<Ack>(b"").is_err());
    }

    #[test]
    fn decode_body_keeps_paged_data_arrays() {
        #[derive(Debug, Deserialize)]
        struct Listing {
            data: Vec<u32>,
            total: u64,
        }

        let listing: Listing = decode_body(br#"{"data": [1, 2], "total": 2}"#).expect("listing");
        assert_eq!(listing.data, vec![1, 2]);
        assert_eq!(listing.total, 2);
    }

    #[test]
    fn disposition_filename() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="products.xlsx""#).as_deref(),
            Some("products.xlsx")
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn requests_are_replayable() {
        let request = ApiRequest::get("/admin/products")
            .query("page", 2)
            .query("search", "cola");
        let copy = request.clone();
        assert_eq!(copy.path(), "/admin/products");
        assert_eq!(copy.query.len(), 2);
        assert!(copy.refresh_on_unauthorized);
        assert!(!request.without_refresh().refresh_on_unauthorized);
    }
}
