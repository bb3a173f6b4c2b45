//! Router-level tests exercising the HTTP surface end to end over an
//! in-memory database.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

/// Parses a JSON field carrying a decimal (serialized as a string).
fn decimal_field(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .expect("decimal fields serialize as strings")
        .parse()
        .expect("decimal field parses")
}

#[tokio::test]
async fn status_and_health_endpoints_respond() {
    let app = TestApp::new().await;

    let (status, body) = app.request_json(Method::GET, "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["service"], json!("cocina-api"));

    let (status, body) = app.request_json(Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], json!("healthy"));
}

#[tokio::test]
async fn ingredient_crud_over_http() {
    let app = TestApp::new().await;

    let (status, created) = app
        .request_json(
            Method::POST,
            "/api/v1/ingredients",
            Some(json!({
                "name": "Harina",
                "quantity": "50.00",
                "unit": "kg",
                "unit_price": "0.60"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("ingredient id");

    let (status, fetched) = app
        .request_json(Method::GET, &format!("/api/v1/ingredients/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], json!("Harina"));

    let (status, updated) = app
        .request_json(
            Method::PUT,
            &format!("/api/v1/ingredients/{}", id),
            Some(json!({ "unit_price": "0.75" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal_field(&updated["unit_price"]), dec!(0.75));

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/ingredients/{}", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = app
        .request_json(Method::GET, &format!("/api/v1/ingredients/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_ingredient_payload_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/ingredients",
            Some(json!({
                "name": "Cebolla",
                "quantity": "-1",
                "unit": "kg",
                "unit_price": "0.80"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Bad Request"));
}

#[tokio::test]
async fn low_stock_and_inventory_value_endpoints() {
    let app = TestApp::new().await;

    for (name, quantity) in [("Bajo", "5"), ("Justo", "10"), ("Sobrado", "15")] {
        let (status, _) = app
            .request_json(
                Method::POST,
                "/api/v1/ingredients",
                Some(json!({
                    "name": name,
                    "quantity": quantity,
                    "unit": "kg",
                    "unit_price": "2.00"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .request_json(Method::GET, "/api/v1/ingredients/low-stock", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let low = body["ingredients"].as_array().expect("ingredient array");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["name"], json!("Bajo"));

    // (5 + 10 + 15) * 2.00 = 60.00
    let (status, body) = app
        .request_json(Method::GET, "/api/v1/ingredients/inventory-value", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_value"], json!("60.00"));
}

#[tokio::test]
async fn recipe_costing_flow_over_http() {
    let app = TestApp::new().await;

    let (_, cheese) = app
        .request_json(
            Method::POST,
            "/api/v1/ingredients",
            Some(json!({
                "name": "Queso",
                "quantity": "20",
                "unit": "kg",
                "unit_price": "2.50"
            })),
        )
        .await;
    let cheese_id = cheese["id"].as_i64().unwrap();

    let (status, recipe) = app
        .request_json(
            Method::POST,
            "/api/v1/recipes",
            Some(json!({
                "name": "Quesadillas",
                "description": "Con tortilla de maiz",
                "portions": "4",
                "category": "antojitos",
                "ingredients": [{ "ingredient_id": cheese_id, "quantity": "4" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let recipe_id = recipe["id"].as_i64().unwrap();

    let (status, cost) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/recipes/{}/cost", recipe_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cost["total_cost"], json!("10.00"));

    // Price change is not retroactive until the association is re-saved.
    app.request_json(
        Method::PUT,
        &format!("/api/v1/ingredients/{}", cheese_id),
        Some(json!({ "unit_price": "3.00" })),
    )
    .await;

    let (_, cost) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/recipes/{}/cost", recipe_id),
            None,
        )
        .await;
    assert_eq!(cost["total_cost"], json!("10.00"));

    let (status, _) = app
        .request_json(
            Method::PUT,
            &format!("/api/v1/recipes/{}/ingredients/{}", recipe_id, cheese_id),
            Some(json!({ "quantity": "4" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, cost) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/recipes/{}/cost", recipe_id),
            None,
        )
        .await;
    assert_eq!(cost["total_cost"], json!("12.00"));

    // The detail view carries lines and the same cost.
    let (status, detail) = app
        .request_json(Method::GET, &format!("/api/v1/recipes/{}", recipe_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["total_cost"], json!("12.00"));
    assert_eq!(detail["ingredients"][0]["ingredient_name"], json!("Queso"));

    // Deleting the referenced ingredient is refused.
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/ingredients/{}", cheese_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recipe_ingredient_collection_filters_by_recipe() {
    let app = TestApp::new().await;

    let (_, onion) = app
        .request_json(
            Method::POST,
            "/api/v1/ingredients",
            Some(json!({
                "name": "Cebolla",
                "quantity": "10",
                "unit": "kg",
                "unit_price": "0.80"
            })),
        )
        .await;
    let onion_id = onion["id"].as_i64().unwrap();

    let mut recipe_ids = Vec::new();
    for name in ["Sopa", "Salsa"] {
        let (_, recipe) = app
            .request_json(
                Method::POST,
                "/api/v1/recipes",
                Some(json!({
                    "name": name,
                    "description": "",
                    "portions": "2",
                    "category": "base",
                    "ingredients": [{ "ingredient_id": onion_id, "quantity": "1" }]
                })),
            )
            .await;
        recipe_ids.push(recipe["id"].as_i64().unwrap());
    }

    let (status, all) = app
        .request_json(Method::GET, "/api/v1/recipe-ingredients", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, filtered) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/recipe-ingredients?recipe={}", recipe_ids[0]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["recipe_id"], json!(recipe_ids[0]));
}

#[tokio::test]
async fn sales_flow_and_summary_over_http() {
    let app = TestApp::new().await;

    let (_, recipe) = app
        .request_json(
            Method::POST,
            "/api/v1/recipes",
            Some(json!({
                "name": "Tacos",
                "description": "",
                "portions": "3",
                "category": "antojitos"
            })),
        )
        .await;
    let recipe_id = recipe["id"].as_i64().unwrap();

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "recipe_ids": [recipe_id],
                "total": "150.00",
                "completed": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "recipe_ids": [recipe_id],
                "total": "80.00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Empty recipe list is rejected.
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/sales",
            Some(json!({ "recipe_ids": [], "total": "10.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = app
        .request_json(Method::GET, "/api/v1/sales/summary", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["completed_sales"], json!(1));
    assert_eq!(summary["pending_sales"], json!(1));
    assert_eq!(summary["completed_total"], json!("150.00"));
}

#[tokio::test]
async fn waste_flow_and_summary_over_http() {
    let app = TestApp::new().await;

    let (_, chicken) = app
        .request_json(
            Method::POST,
            "/api/v1/ingredients",
            Some(json!({
                "name": "Pollo",
                "quantity": "10",
                "unit": "kg",
                "unit_price": "4.00"
            })),
        )
        .await;
    let chicken_id = chicken["id"].as_i64().unwrap();

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/waste",
            Some(json!({ "ingredient_id": chicken_id, "quantity": "2.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // The ledger reflects the adjustment.
    let (_, ingredient) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/ingredients/{}", chicken_id),
            None,
        )
        .await;
    assert_eq!(decimal_field(&ingredient["quantity"]), dec!(12.50));

    // Unknown ingredients and non-positive quantities are rejected.
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/waste",
            Some(json!({ "ingredient_id": 9999, "quantity": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/waste",
            Some(json!({ "ingredient_id": chicken_id, "quantity": "0" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = app
        .request_json(Method::GET, "/api/v1/waste/summary", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let summary = summary.as_array().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["ingredient_name"], json!("Pollo"));
    assert_eq!(summary[0]["total_quantity"], json!("2.50"));
}

#[tokio::test]
async fn user_responses_never_carry_credential_material() {
    let app = TestApp::new().await;

    let (status, created) = app
        .request_json(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "chef",
                "email": "chef@example.com",
                "password": "secret-password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["username"], json!("chef"));
    assert!(created.get("password").is_none());
    assert!(created.get("password_hash").is_none());

    // Short passwords are rejected.
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "sous",
                "email": "sous@example.com",
                "password": "short"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate usernames are rejected.
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "chef",
                "email": "other@example.com",
                "password": "another-password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
