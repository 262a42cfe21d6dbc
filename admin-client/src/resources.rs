use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::http::{ApiClient, ApiRequest, Download};

const MAX_PER_PAGE: u32 = 100;

/// Admin collections exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminResource {
    Products,
    Units,
    Roles,
    Users,
}

impl AdminResource {
    pub fn path(&self) -> &'static str {
        match self {
            AdminResource::Products => "admin/products",
            AdminResource::Units => "admin/units",
            AdminResource::Roles => "admin/roles",
            AdminResource::Users => "admin/users",
        }
    }

    /// Permission module guarding the collection, e.g. `products.view`.
    pub fn module(&self) -> &'static str {
        match self {
            AdminResource::Products => "products",
            AdminResource::Units => "units",
            AdminResource::Roles => "roles",
            AdminResource::Users => "users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl ListQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.page == Some(0) {
            return Err(ClientError::Validation("page starts at 1".into()));
        }
        match self.per_page {
            Some(0) => Err(ClientError::Validation("per_page must be positive".into())),
            Some(n) if n > MAX_PER_PAGE => Err(ClientError::Validation(format!(
                "per_page cannot exceed {MAX_PER_PAGE}"
            ))),
            _ => Ok(()),
        }
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(page) = self.page {
            request = request.query("page", page);
        }
        if let Some(per_page) = self.per_page {
            request = request.query("per_page", per_page);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            request = request.query("search", search);
        }
        if self.include_inactive {
            request = request.query("include_inactive", true);
        }
        request
    }
}

/// One page of a collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "items")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub last_page: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.page < self.last_page
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: BigDecimal,
    #[serde(default)]
    pub cost_price: Option<BigDecimal>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    #[serde(default = "active_default")]
    pub is_active: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default = "active_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Seeded roles: name and permissions are fixed, status may still change.
    #[serde(default)]
    pub is_system: bool,
    #[serde(default = "active_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub employee_code: Option<String>,
    #[serde(default)]
    pub role_id: Option<Uuid>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub kiosk_enabled: bool,
    #[serde(default = "active_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUserInput {
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    pub kiosk_enabled: bool,
}

/// Catalog entry for a permission code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
}

impl Permission {
    /// Explicit module, else the prefix of the code.
    pub fn module(&self) -> &str {
        self.module
            .as_deref()
            .unwrap_or_else(|| common_auth::module_of(&self.code))
    }
}

/// Group a permission catalog for a role editor.
pub fn group_by_module(permissions: &[Permission]) -> BTreeMap<String, Vec<Permission>> {
    let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        grouped
            .entry(permission.module().to_string())
            .or_default()
            .push(permission.clone());
    }
    grouped
}

fn active_default() -> bool {
    true
}

/// Typed CRUD over one admin collection.
pub struct ResourceClient<T> {
    api: Arc<ApiClient>,
    resource: AdminResource,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            resource: self.resource,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> ResourceClient<T> {
    pub fn new(api: Arc<ApiClient>, resource: AdminResource) -> Self {
        Self {
            api,
            resource,
            _marker: PhantomData,
        }
    }

    pub fn resource(&self) -> AdminResource {
        self.resource
    }

    pub async fn list(&self, query: &ListQuery) -> ClientResult<Page<T>> {
        self.list_with(query, None).await
    }

    /// List, abandoning the call when `cancel` fires (e.g. the view unmounted).
    pub async fn list_with(
        &self,
        query: &ListQuery,
        cancel: Option<&CancellationToken>,
    ) -> ClientResult<Page<T>> {
        query.validate()?;
        let request = query.apply(ApiRequest::get(self.resource.path()));
        self.api.json_with(&request, cancel).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<T> {
        self.api.json(&ApiRequest::get(self.item_path(id))).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> ClientResult<T> {
        let request = ApiRequest::post(self.resource.path()).json(body)?;
        let created = self.api.json(&request).await?;
        info!(resource = self.resource.module(), "record created");
        Ok(created)
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: Uuid, body: &B) -> ClientResult<T> {
        let request = ApiRequest::put(self.item_path(id)).json(body)?;
        self.api.json(&request).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.api.send(&ApiRequest::delete(self.item_path(id))).await?;
        info!(resource = self.resource.module(), %id, "record deleted");
        Ok(())
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> ClientResult<T> {
        let request = ApiRequest::patch(format!("{}/status", self.item_path(id)))
            .json(&json!({ "is_active": active }))?;
        self.api.json(&request).await
    }

    pub async fn export(
        &self,
        format: ExportFormat,
        query: &ListQuery,
        cancel: Option<&CancellationToken>,
    ) -> ClientResult<Download> {
        query.validate()?;
        let path = format!("{}/export/{}", self.resource.path(), format.as_str());
        let request = query.apply(ApiRequest::get(path));
        self.api.download(&request, cancel).await
    }

    fn item_path(&self, id: Uuid) -> String {
        format!("{}/{id}", self.resource.path())
    }
}

/// Roles with the system-role edit lock applied client-side.
#[derive(Clone)]
pub struct RolesClient {
    inner: ResourceClient<Role>,
}

impl RolesClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            inner: ResourceClient::new(api, AdminResource::Roles),
        }
    }

    pub fn records(&self) -> &ResourceClient<Role> {
        &self.inner
    }

    pub async fn list(&self, query: &ListQuery) -> ClientResult<Page<Role>> {
        self.inner.list(query).await
    }

    pub async fn create(&self, input: &RoleInput) -> ClientResult<Role> {
        validate_role_input(input)?;
        self.inner.create(input).await
    }

    /// Renaming or re-permissioning a system role is refused before sending.
    pub async fn update(&self, current: &Role, input: &RoleInput) -> ClientResult<Role> {
        validate_role_input(input)?;
        check_system_role_edit(current, input)?;
        self.inner.update(current.id, input).await
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> ClientResult<Role> {
        self.inner.set_active(id, active).await
    }

    pub async fn delete(&self, current: &Role) -> ClientResult<()> {
        if current.is_system {
            return Err(ClientError::Validation(format!(
                "'{}' is a system role and cannot be deleted",
                current.name
            )));
        }
        self.inner.delete(current.id).await
    }

    /// Full permission catalog for the role editor.
    pub async fn permissions(&self) -> ClientResult<Vec<Permission>> {
        self.inner
            .api
            .json(&ApiRequest::get("admin/permissions"))
            .await
    }
}

fn validate_role_input(input: &RoleInput) -> ClientResult<()> {
    if input.name.trim().is_empty() {
        return Err(ClientError::Validation("Role name is required".into()));
    }
    Ok(())
}

fn check_system_role_edit(current: &Role, input: &RoleInput) -> ClientResult<()> {
    if !current.is_system {
        return Ok(());
    }
    if input.name.trim() != current.name {
        return Err(ClientError::Validation(format!(
            "'{}' is a system role and cannot be renamed",
            current.name
        )));
    }
    let mut wanted: Vec<&str> = input.permissions.iter().map(String::as_str).collect();
    let mut existing: Vec<&str> = current.permissions.iter().map(String::as_str).collect();
    wanted.sort_unstable();
    existing.sort_unstable();
    if wanted != existing {
        return Err(ClientError::Validation(format!(
            "permissions of system role '{}' cannot be changed",
            current.name
        )));
    }
    Ok(())
}
