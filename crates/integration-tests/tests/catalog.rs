//! Products, categories, banners and the dashboard over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use vitrine_integration_tests::TestApp;

async fn create_product(app: &TestApp, body: Value) -> Value {
    let (status, product) = app
        .authed(Method::POST, "/api/products", Some(&body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    product
}

fn assert_amount(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new().await;

    let created = create_product(
        &app,
        json!({
            "name": "Vestido Midi Floral",
            "price": "189,90",
            "oldPrice": 229.9,
            "category": "vestidos",
            "stock": 7,
            "active": true,
            "variants": [{"color": "Azul", "colorHex": "#1d4ed8", "size": "M", "qty": 3}]
        }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();
    assert_amount(&created["price"], 189.9);
    assert_amount(&created["oldPrice"], 229.9);
    assert_eq!(created["variants"][0]["colorHex"], "#1d4ed8");
    assert!(created["createdAt"].is_string());

    let (status, fetched) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Vestido Midi Floral");

    // Merge update keeps untouched fields
    let (status, updated) = app
        .authed(
            Method::PUT,
            &format!("/api/products/{id}"),
            Some(&json!({"price": 159.9, "badge": "Promo"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_amount(&updated["price"], 159.9);
    assert_eq!(updated["badge"], "Promo");
    assert_eq!(updated["stock"], 7);
    assert_eq!(updated["category"], "vestidos");
    assert!(updated["updatedAt"].is_string());

    let (status, body) = app
        .authed(Method::DELETE, &format!("/api/products/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Produto removido com sucesso");

    let (status, body) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Produto não encontrado");
}

#[tokio::test]
async fn test_product_ids_increase() {
    let app = TestApp::new().await;
    let a = create_product(&app, json!({"name": "Blusa", "price": 59})).await;
    let b = create_product(&app, json!({"name": "Saia", "price": 79})).await;
    assert_eq!(a["id"], 1);
    assert_eq!(b["id"], 2);
    assert_eq!(a["active"], false);
}

#[tokio::test]
async fn test_product_listing_active_filter() {
    let app = TestApp::new().await;
    create_product(&app, json!({"name": "Ativo", "price": 10, "active": true})).await;
    create_product(&app, json!({"name": "Rascunho", "price": 10})).await;

    let (_, all) = app.get("/api/products").await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, active) = app.get("/api/products?active=true").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = active
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Ativo"]);
}

#[tokio::test]
async fn test_product_validation() {
    let app = TestApp::new().await;

    let (status, body) = app
        .authed(
            Method::POST,
            "/api/products",
            Some(&json!({"name": "  ", "price": 10})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name is required");

    let (status, body) = app
        .authed(
            Method::POST,
            "/api/products",
            Some(&json!({"name": "Blusa", "price": -1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "price cannot be negative");

    let (_, all) = app.get("/api/products").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_product_update_unknown() {
    let app = TestApp::new().await;
    let (status, body) = app
        .authed(Method::PUT, "/api/products/42", Some(&json!({"stock": 1})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Produto não encontrado");
}

#[tokio::test]
async fn test_product_delete_is_idempotent() {
    let app = TestApp::new().await;
    let (status, body) = app
        .authed(Method::DELETE, "/api/products/404", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Produto removido com sucesso");
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_categories_slug_order_and_conflict() {
    let app = TestApp::new().await;

    let (status, first) = app
        .authed(
            Method::POST,
            "/api/categories",
            Some(&json!({"name": "Vestidos Longos", "icon": "dress"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], "vestidos-longos");

    let (status, _) = app
        .authed(
            Method::POST,
            "/api/categories",
            Some(&json!({"id": "acessorios", "name": "Acessórios"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .authed(
            Method::POST,
            "/api/categories",
            Some(&json!({"name": "Vestidos longos"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Move the second category to the front
    let (status, moved) = app
        .authed(
            Method::PUT,
            "/api/categories/acessorios",
            Some(&json!({"order": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["name"], "Acessórios");

    let (_, list) = app.get("/api/categories").await;
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["acessorios", "vestidos-longos"]);
}

#[tokio::test]
async fn test_category_update_and_delete() {
    let app = TestApp::new().await;

    let (status, body) = app
        .authed(
            Method::PUT,
            "/api/categories/nada",
            Some(&json!({"name": "Nada"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Categoria não encontrada");

    app.authed(
        Method::POST,
        "/api/categories",
        Some(&json!({"name": "Saias"})),
    )
    .await;
    let (status, body) = app
        .authed(Method::DELETE, "/api/categories/saias", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Categoria removida");

    let (_, list) = app.get("/api/categories").await;
    assert!(list.as_array().unwrap().is_empty());
}

// =============================================================================
// Banners
// =============================================================================

#[tokio::test]
async fn test_banner_lifecycle() {
    let app = TestApp::new().await;

    let (status, banner) = app
        .authed(
            Method::POST,
            "/api/banners",
            Some(&json!({"image": "images/verao.webp", "title": "Coleção Verão"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(banner["active"], true);
    let id = banner["id"].as_i64().unwrap();

    let (status, updated) = app
        .authed(
            Method::PUT,
            &format!("/api/banners/{id}"),
            Some(&json!({"active": false, "subtitle": "Até 30% off"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["active"], false);
    assert_eq!(updated["title"], "Coleção Verão");
    assert_eq!(updated["subtitle"], "Até 30% off");

    let (status, body) = app
        .authed(Method::DELETE, &format!("/api/banners/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Banner removido");

    let (status, body) = app
        .authed(
            Method::PUT,
            &format!("/api/banners/{id}"),
            Some(&json!({"title": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Banner não encontrado");
}

#[tokio::test]
async fn test_banner_requires_image() {
    let app = TestApp::new().await;
    let (status, body) = app
        .authed(
            Method::POST,
            "/api/banners",
            Some(&json!({"image": "", "title": "Sem imagem"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "image is required");
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_stats() {
    let app = TestApp::new().await;
    create_product(
        &app,
        json!({"name": "A", "price": 10, "stock": 2, "active": true}),
    )
    .await;
    create_product(&app, json!({"name": "B", "price": 10, "stock": 20})).await;
    app.authed(
        Method::POST,
        "/api/categories",
        Some(&json!({"name": "Blusas"})),
    )
    .await;

    let (status, stats) = app
        .authed(Method::GET, "/api/dashboard/stats", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalProducts"], 2);
    assert_eq!(stats["activeProducts"], 1);
    assert_eq!(stats["totalCategories"], 1);
    assert_eq!(stats["totalBanners"], 0);
    assert_eq!(stats["totalStock"], 22);
    assert_eq!(stats["lowStockProducts"], 1);
    assert_eq!(stats["recentProducts"][0]["name"], "B");
}

#[tokio::test]
async fn test_dashboard_requires_token() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/dashboard/stats").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
