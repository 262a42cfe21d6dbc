mod support;

use std::sync::Arc;

use admin_client::{
    group_by_module, AdminResource, ClientError, ExportFormat, ListQuery, MemoryStorage, Product,
    ResourceClient, RoleInput, RolesClient, SessionManager, SessionStorage,
};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;
use uuid::Uuid;

const PRODUCT_ID: &str = "6f1c2d3e-4b5a-4c6d-8e7f-9a0b1c2d3e4f";
const ROLE_ID: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

fn signed_in(server: &MockServer) -> SessionManager {
    let storage = MemoryStorage::new();
    storage
        .set("token", &support::mint_token("owner", 3600))
        .expect("seed token");
    storage.set("role", "owner").expect("seed role");
    SessionManager::with_storage(&support::config(server), Arc::new(storage)).expect("manager")
}

#[tokio::test]
async fn list_products_sends_paging_and_search() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/admin/products")
                .query_param("page", "2")
                .query_param("per_page", "25")
                .query_param("search", "cola");
            then.status(200).json_body(json!({
                "data": [{ "id": PRODUCT_ID, "name": "Cola 330ml", "price": "1.20" }],
                "total": 26,
                "page": 2,
                "per_page": 25,
                "last_page": 2
            }));
        })
        .await;

    let manager = signed_in(&server);
    let products: ResourceClient<Product> =
        ResourceClient::new(manager.api().clone(), AdminResource::Products);
    let page = products
        .list(&ListQuery::default().page(2).per_page(25).search("  cola "))
        .await
        .expect("list");

    list.assert_async().await;
    assert_eq!(page.total, 26);
    assert_eq!(page.data[0].name, "Cola 330ml");
    assert!(!page.has_more());
}

#[tokio::test]
async fn invalid_query_is_rejected_locally() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/admin/products");
            then.status(200).json_body(json!({ "data": [] }));
        })
        .await;

    let manager = signed_in(&server);
    let products: ResourceClient<Product> =
        ResourceClient::new(manager.api().clone(), AdminResource::Products);
    let err = products
        .list(&ListQuery::default().per_page(500))
        .await
        .expect_err("too large");

    assert!(matches!(err, ClientError::Validation(_)));
    list.assert_hits_async(0).await;
}

#[tokio::test]
async fn set_active_patches_status_endpoint() {
    let server = MockServer::start_async().await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path(format!("/api/admin/products/{PRODUCT_ID}/status"))
                .json_body(json!({ "is_active": false }));
            then.status(200).json_body(json!({
                "data": { "id": PRODUCT_ID, "name": "Cola 330ml", "price": "1.20", "is_active": false }
            }));
        })
        .await;

    let manager = signed_in(&server);
    let products: ResourceClient<Product> =
        ResourceClient::new(manager.api().clone(), AdminResource::Products);
    let id = Uuid::parse_str(PRODUCT_ID).expect("uuid");
    let product = products.set_active(id, false).await.expect("deactivate");

    patch.assert_async().await;
    assert!(!product.is_active);
}

#[tokio::test]
async fn export_returns_bytes_and_filename() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/admin/units/export/excel");
            then.status(200)
                .header(
                    "Content-Type",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                )
                .header("Content-Disposition", r#"attachment; filename="units.xlsx""#)
                .body(vec![0x50, 0x4b, 0x03, 0x04]);
        })
        .await;

    let manager = signed_in(&server);
    let units: ResourceClient<admin_client::Unit> =
        ResourceClient::new(manager.api().clone(), AdminResource::Units);
    let download = units
        .export(ExportFormat::Excel, &ListQuery::default(), None)
        .await
        .expect("export");

    assert_eq!(download.bytes, vec![0x50, 0x4b, 0x03, 0x04]);
    assert_eq!(download.filename.as_deref(), Some("units.xlsx"));
}

#[tokio::test]
async fn forbidden_response_maps_to_authorization_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path(format!("/api/admin/products/{PRODUCT_ID}"));
            then.status(403)
                .json_body(json!({ "code": "FORBIDDEN", "message": "Missing products.delete" }));
        })
        .await;

    let manager = signed_in(&server);
    let products: ResourceClient<Product> =
        ResourceClient::new(manager.api().clone(), AdminResource::Products);
    let err = products
        .delete(Uuid::parse_str(PRODUCT_ID).expect("uuid"))
        .await
        .expect_err("forbidden");

    assert_eq!(err.kind(), "authorization");
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn system_roles_refuse_renames_but_toggle_status() {
    let server = MockServer::start_async().await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/api/admin/roles/{ROLE_ID}"));
            then.status(200).json_body(json!({}));
        })
        .await;
    let status = server
        .mock_async(|when, then| {
            when.method(PATCH).path(format!("/api/admin/roles/{ROLE_ID}/status"));
            then.status(200).json_body(json!({
                "id": ROLE_ID,
                "name": "Cashier",
                "permissions": ["sales.create"],
                "is_system": true,
                "is_active": false
            }));
        })
        .await;

    let manager = signed_in(&server);
    let roles = RolesClient::new(manager.api().clone());
    let current: admin_client::Role = serde_json::from_value(json!({
        "id": ROLE_ID,
        "name": "Cashier",
        "permissions": ["sales.create"],
        "is_system": true
    }))
    .expect("role");

    let err = roles
        .update(
            &current,
            &RoleInput {
                name: "Head cashier".into(),
                description: None,
                permissions: vec!["sales.create".into()],
            },
        )
        .await
        .expect_err("rename refused");
    assert!(matches!(err, ClientError::Validation(_)));
    update.assert_hits_async(0).await;

    let toggled = roles.set_active(current.id, false).await.expect("toggle");
    status.assert_async().await;
    assert!(!toggled.is_active);
    assert!(toggled.is_system);
}

#[tokio::test]
async fn permission_catalog_groups_by_module() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/admin/permissions");
            then.status(200).json_body(json!({
                "data": [
                    { "code": "products.view", "name": "View products" },
                    { "code": "products.create", "name": "Create products" },
                    { "code": "users.view", "name": "View users", "module": "users" }
                ]
            }));
        })
        .await;

    let manager = signed_in(&server);
    let catalog = RolesClient::new(manager.api().clone())
        .permissions()
        .await
        .expect("catalog");
    let grouped = group_by_module(&catalog);

    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped["products"].len(), 2);
    assert_eq!(grouped["users"][0].code, "users.view");
}
