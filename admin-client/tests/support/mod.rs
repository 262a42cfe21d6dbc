#![allow(dead_code)]

use std::sync::Arc;

use admin_client::{ClientConfig, MemoryStorage, SessionManager};
use chrono::Utc;
use httpmock::MockServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

pub const TENANT_ID: &str = "3b2f6c1e-8d4a-4f0b-9c6e-2a1d5e7f9b10";
pub const USER_ID: &str = "0d1f5a9e-7c1b-4a57-8f3e-1b2c3d4e5f60";

/// HS256 token; the client never checks the signature.
pub fn mint_token(role: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": USER_ID,
        "role": role,
        "tenant_id": TENANT_ID,
        "iat": now,
        "exp": now + ttl_secs,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("encode token")
}

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(&server.url("/api")).expect("config")
}

pub fn manager(server: &MockServer) -> (SessionManager, MemoryStorage) {
    let storage = MemoryStorage::new();
    let manager =
        SessionManager::with_storage(&config(server), Arc::new(storage.clone())).expect("manager");
    (manager, storage)
}

pub fn tenant(status: &str) -> Value {
    json!({
        "id": TENANT_ID,
        "shop_name": "Corner Shop",
        "business_type": "retail",
        "schema_name": "tenant_corner_shop",
        "registration_status": status,
        "currency": "USD",
        "timezone": "UTC"
    })
}

pub fn employee(permissions: &[&str]) -> Value {
    json!({
        "id": USER_ID,
        "email": "cashier@shop.test",
        "full_name": "Casey Cashier",
        "user_type": "employee",
        "kiosk_enabled": true,
        "role_name": "Cashier",
        "permissions": permissions,
    })
}

pub fn kiosk_user() -> Value {
    json!({
        "id": USER_ID,
        "user_id": "EMP001",
        "full_name": "Casey Cashier",
        "role_name": "Cashier",
        "permissions": ["sales.create"],
    })
}
