//! API integration tests
//!
//! Run against a live server started with the default configuration:
//!
//!     cargo run &
//!     cargo test --test api_tests -- --ignored

use radiodesk_server::models::session::{Role, Session};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const JWT_SECRET: &str = "change-this-secret-in-production";

/// Token signed with the server's secret
fn auth_token() -> String {
    let now = chrono::Utc::now().timestamp();
    Session {
        sub: "api-tests".to_string(),
        name: "API tests".to_string(),
        role: Role::Admin,
        company_id: None,
        exp: now + 600,
        iat: now,
    }
    .create_token(JWT_SECRET)
    .expect("Failed to sign token")
}

async fn post_json(client: &Client, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(auth_token())
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Company with one site, returning (company_id, site_id)
async fn create_site(client: &Client, label: &str) -> (i64, i64) {
    let (status, company) = post_json(client, "/companies", json!({ "name": format!("Société {}", label) })).await;
    assert_eq!(status, StatusCode::CREATED);
    let company_id = company["id"].as_i64().unwrap();

    let (status, site) = post_json(
        client,
        "/sites",
        json!({ "company_id": company_id, "name": format!("Site {}", label) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (company_id, site["id"].as_i64().unwrap())
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_missing_token_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_create_equipment_assigns_reference() {
    let client = Client::new();
    let (status, body) = post_json(&client, "/equipment", json!({ "name": "Micro SM7B" })).await;

    assert_eq!(status, StatusCode::CREATED);
    let reference = body["reference"].as_str().unwrap();
    assert!(reference.starts_with("INV-"), "{}", reference);
    assert_eq!(body["is_archived"], false);
}

#[tokio::test]
#[ignore]
async fn test_equipment_name_required() {
    let client = Client::new();
    let (status, body) = post_json(&client, "/equipment", json!({ "name": "" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
#[ignore]
async fn test_company_delete_blocked_by_site() {
    let client = Client::new();
    let (company_id, _) = create_site(&client, "bloquée").await;

    let response = client
        .delete(format!("{}/companies/{}", BASE_URL, company_id))
        .bearer_auth(auth_token())
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["message"].as_str().unwrap().contains("1 active site(s)"));
}

#[tokio::test]
#[ignore]
async fn test_export_csv_headers() {
    let client = Client::new();
    post_json(&client, "/equipment", json!({ "name": "Câble XLR \"5m\", noir" })).await;

    let response = client
        .get(format!("{}/equipment/export.csv", BASE_URL))
        .bearer_auth(auth_token())
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    let bytes = response.bytes().await.unwrap();
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("\"Câble XLR \"\"5m\"\", noir\""));
}

#[tokio::test]
#[ignore]
async fn test_unknown_movement_type_rejected() {
    let client = Client::new();
    let (_, equipment) = post_json(&client, "/equipment", json!({ "name": "Casque" })).await;

    let (status, _) = post_json(
        &client,
        "/movements",
        json!({
            "equipment_id": equipment["id"],
            "movement_type_id": "does-not-exist"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_reference_preview() {
    let client = Client::new();

    let response = client
        .get(format!("{}/settings/reference/next", BASE_URL))
        .bearer_auth(auth_token())
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["reference"].as_str().unwrap().contains('-'));
}
