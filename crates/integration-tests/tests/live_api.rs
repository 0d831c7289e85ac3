//! End-to-end tests against a running API and a migrated database.
//!
//! Ignored by default. Point `CMS_TEST_API_URL` at the API and provide an
//! administrator's credentials (create one with `cms user create --role
//! admin`), then run with `--ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use cms_core::records::{ContrabandItem, CustodyRecord, LoginResponse};
use cms_core::{ItemStatus, Role};

struct LiveApi {
    client: Client,
    base: String,
    token: String,
}

impl LiveApi {
    async fn sign_in() -> Self {
        let base = std::env::var("CMS_TEST_API_URL").expect("CMS_TEST_API_URL not set");
        let email = std::env::var("CMS_TEST_ADMIN_EMAIL").expect("CMS_TEST_ADMIN_EMAIL not set");
        let password =
            std::env::var("CMS_TEST_ADMIN_PASSWORD").expect("CMS_TEST_ADMIN_PASSWORD not set");
        let client = Client::new();

        let response = client
            .post(format!("{base}/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let login: LoginResponse = response.json().await.unwrap();
        assert_eq!(login.user.role, Role::Admin);

        Self {
            client,
            base,
            token: login.token,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
    }

    async fn send_json(&self, method: reqwest::Method, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .request(method, format!("{}{path}", self.base))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
#[ignore = "needs a running API and database"]
async fn test_wrong_password_is_unauthorized() {
    let base = std::env::var("CMS_TEST_API_URL").expect("CMS_TEST_API_URL not set");
    let response = Client::new()
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "nobody@police.et", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "needs a running API and database"]
async fn test_seizure_lifecycle() {
    let api = LiveApi::sign_in().await;

    let categories: Vec<Value> = api.get("/categories").await.json().await.unwrap();
    assert!(!categories.is_empty(), "run `cms seed categories` first");
    let category_id = categories[0]["id"].clone();

    let response = api
        .send_json(
            reqwest::Method::POST,
            "/contraband-items",
            &json!({
                "category_id": category_id,
                "item_name": "Integration test parcel",
                "quantity": "2",
                "unit": "kg",
                "estimated_value": "1500.00",
                "seizure_location": "Bole International Airport",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let item: ContrabandItem = response.json().await.unwrap();
    assert_eq!(item.status, ItemStatus::Seized);
    assert!(!item.seizure_number.is_empty());

    let chain: Vec<CustodyRecord> = api
        .get(&format!("/custody/{}", item.id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].transfer_reason, "Initial seizure");
    assert_eq!(chain[0].from_user_id, None);

    let response = api
        .send_json(
            reqwest::Method::PUT,
            &format!("/contraband-items/{}/status", item.id),
            &json!({ "status": "in_custody" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: ContrabandItem = response.json().await.unwrap();
    assert_eq!(updated.status, ItemStatus::InCustody);

    let logs: Vec<Value> = api.get("/audit-logs?limit=50").await.json().await.unwrap();
    let item_id = item.id.to_string();
    assert!(
        logs.iter()
            .any(|log| log["record_id"] == item_id.as_str()),
        "seizure should be audited"
    );
}

#[tokio::test]
#[ignore = "needs a running API and database"]
async fn test_profile_matches_token() {
    let api = LiveApi::sign_in().await;
    let me: Value = api.get("/users/me").await.json().await.unwrap();
    assert_eq!(me["role"], "admin");
    assert_eq!(me["is_active"], true);
}
