use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use common_auth::{Principal, Session, TenantInfo, TokenInspector};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// Durable storage keys. Values are plain strings or JSON documents.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const TENANT: &str = "tenant";
    pub const ROLE: &str = "role";
    pub const IS_KIOSK: &str = "isKiosk";
    pub const MUST_CHANGE_PASSWORD: &str = "mustChangePassword";

    pub const ALL: [&str; 6] = [TOKEN, USER, TENANT, ROLE, IS_KIOSK, MUST_CHANGE_PASSWORD];
}

/// Synchronous key-value storage that survives restarts.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;

    /// Apply several writes; `None` removes the key.
    fn apply(&self, changes: &[(&str, Option<String>)]) -> ClientResult<()> {
        for (key, value) in changes {
            match value {
                Some(value) => self.set(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("rwlock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// JSON file storage. Every write rewrites the file through a temp file and rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open `path`, starting empty when the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let cache = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "session file corrupt; starting empty");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(ClientError::Storage(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        let storage_err =
            |err: std::io::Error| ClientError::Storage(format!("{}: {err}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(storage_err)?;
        file.write_all(&bytes).map_err(storage_err)?;
        file.sync_all().map_err(storage_err)?;
        fs::rename(&tmp, &self.path).map_err(storage_err)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let guard = self.cache.read().expect("rwlock poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.apply(&[(key, Some(value.to_string()))])
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.apply(&[(key, None)])
    }

    fn apply(&self, changes: &[(&str, Option<String>)]) -> ClientResult<()> {
        let mut guard = self.cache.write().expect("rwlock poisoned");
        let mut next = guard.clone();
        for (key, value) in changes {
            match value {
                Some(value) => {
                    next.insert((*key).to_string(), value.clone());
                }
                None => {
                    next.remove(*key);
                }
            }
        }
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

/// Typed view over [`SessionStorage`] for the session keys.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn SessionStorage>,
    inspector: TokenInspector,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn SessionStorage>, inspector: TokenInspector) -> Self {
        Self { backend, inspector }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), TokenInspector::default())
    }

    pub fn inspector(&self) -> &TokenInspector {
        &self.inspector
    }

    /// Raw stored token; read failures count as "no token".
    pub fn token(&self) -> Option<String> {
        self.read(keys::TOKEN).filter(|token| !token.trim().is_empty())
    }

    pub fn set_token(&self, token: &str) -> ClientResult<()> {
        self.backend.set(keys::TOKEN, token)
    }

    pub fn tenant(&self) -> Option<TenantInfo> {
        self.read_json(keys::TENANT)
    }

    pub fn set_must_change_password(&self, value: bool) -> ClientResult<()> {
        self.backend
            .set(keys::MUST_CHANGE_PASSWORD, if value { "true" } else { "false" })
    }

    /// Replace every session key. Keys the session does not carry are removed,
    /// so a kiosk session never inherits a regular user's leftovers.
    pub fn set_session(&self, session: &Session) -> ClientResult<()> {
        let user = session
            .principal
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tenant = session.tenant.as_ref().map(serde_json::to_string).transpose()?;
        let flag = |value: bool| Some(if value { "true" } else { "false" }.to_string());

        self.backend.apply(&[
            (keys::TOKEN, session.access_token.clone()),
            (keys::USER, user),
            (keys::TENANT, tenant),
            (keys::ROLE, session.role.clone()),
            (keys::IS_KIOSK, flag(session.is_kiosk)),
            (keys::MUST_CHANGE_PASSWORD, flag(session.must_change_password)),
        ])
    }

    pub fn clear_session(&self) -> ClientResult<()> {
        let changes: Vec<(&str, Option<String>)> =
            keys::ALL.iter().map(|key| (*key, None)).collect();
        self.backend.apply(&changes)
    }

    /// Rebuild a best-effort session from storage without a round trip.
    ///
    /// A missing, undecodable or expired token collapses the session to
    /// signed-out and wipes whatever else was stored.
    pub fn load_session(&self) -> ClientResult<Session> {
        let Some(token) = self.token() else {
            self.clear_session()?;
            return Ok(Session::signed_out());
        };

        let claims = match self.inspector.inspect(&token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "stored token unusable; clearing session");
                self.clear_session()?;
                return Ok(Session::signed_out());
            }
        };

        let principal: Option<Principal> = self.read_json(keys::USER);
        let role = self.read(keys::ROLE).or(claims.role);

        Ok(Session {
            access_token: Some(token),
            principal,
            tenant: self.tenant(),
            role,
            is_kiosk: self.read_flag(keys::IS_KIOSK),
            must_change_password: self.read_flag(keys::MUST_CHANGE_PASSWORD),
            is_authenticated: true,
        })
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "session storage read failed");
                None
            }
        }
    }

    fn read_flag(&self, key: &str) -> bool {
        self.read(key).as_deref() == Some("true")
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "ignoring corrupt session value");
                None
            }
        }
    }
}
