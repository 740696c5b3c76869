use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use stockhouse_auth::{JwtClaims, Role};
use stockhouse_core::{UserId, Warehouse};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod over an in-memory ledger, on an ephemeral port.
        let app = stockhouse_api::app::build_app(jwt_secret.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, username: &str, role: Role, warehouse: Option<Warehouse>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        username: username.to_string(),
        role,
        warehouse,
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token() -> String {
    mint_jwt(SECRET, "admin", Role::Admin, None)
}

async fn create_dress(client: &reqwest::Client, srv: &TestServer, token: &str, name: &str) -> String {
    let res = client
        .post(srv.url("/products"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "category": "dress",
            "color": "ivory",
            "back_solution": null,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn quantity(client: &reqwest::Client, srv: &TestServer, token: &str, path: &str) -> i64 {
    let res = client
        .get(srv.url(path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = mint_jwt("other-secret", "admin", Role::Admin, None);
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn actor_is_derived_from_token() {
    let srv = TestServer::spawn(SECRET).await;
    let token = mint_jwt(SECRET, "jana", Role::Storekeeper, Some(Warehouse::Pardubice));

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "jana");
    assert_eq!(body["role"], "storekeeper");
    assert_eq!(body["warehouse"], "pardubice");
    assert_eq!(body["privileged"], true);
}

#[tokio::test]
async fn transfer_lifecycle_over_http() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let brno = mint_jwt(SECRET, "eva", Role::Storekeeper, Some(Warehouse::Brno));

    let id = create_dress(&client, &srv, &admin, "P").await;

    let res = client
        .post(srv.url("/stock/inbound"))
        .bearer_auth(&admin)
        .json(&json!({ "product_id": id, "warehouse": "prague", "size": 38, "quantity": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/transfers"))
        .bearer_auth(&admin)
        .json(&json!({
            "source": "prague",
            "target": "brno",
            "lines": [{ "product_id": id, "size": 38, "quantity": 4 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let transfer: Value = res.json().await.unwrap();
    let transfer_id = transfer["id"].as_str().unwrap().to_string();
    assert_eq!(transfer["status"], "in-transit");

    let prague_path = format!("/stock/prague/{id}/38");
    let brno_path = format!("/stock/brno/{id}/38");
    assert_eq!(quantity(&client, &srv, &admin, &prague_path).await, 6);
    assert_eq!(quantity(&client, &srv, &admin, &brno_path).await, 0);

    let res = client
        .get(srv.url("/transfers/pending-count"))
        .bearer_auth(&brno)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);

    let res = client
        .post(srv.url(&format!("/transfers/{transfer_id}/confirm")))
        .bearer_auth(&brno)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["applied"], true);

    let res = client
        .post(srv.url(&format!("/transfers/{transfer_id}/confirm")))
        .bearer_auth(&brno)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["applied"], false);

    assert_eq!(quantity(&client, &srv, &admin, &brno_path).await, 4);
    assert_eq!(quantity(&client, &srv, &admin, &prague_path).await, 6);

    let res = client
        .get(srv.url(&format!("/transfers/{transfer_id}/document")))
        .bearer_auth(&brno)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let doc: Value = res.json().await.unwrap();
    assert_eq!(doc["total_units"], 4);
    assert_eq!(doc["lines"][0]["label"], "P-ivory");
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let ostrava = mint_jwt(SECRET, "olga", Role::Storekeeper, Some(Warehouse::Ostrava));

    let id = create_dress(&client, &srv, &admin, "Aurora").await;

    let res = client
        .post(srv.url("/stock/outbound"))
        .bearer_auth(&admin)
        .json(&json!({ "product_id": id, "warehouse": "prague", "size": 38, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert!(body["message"].as_str().unwrap().contains("Aurora-ivory"));

    let res = client
        .post(srv.url("/stock/inbound"))
        .bearer_auth(&admin)
        .json(&json!({ "product_id": id, "warehouse": "prague", "size": 39, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_size");

    let res = client
        .post(srv.url("/stock/inbound"))
        .bearer_auth(&ostrava)
        .json(&json!({ "product_id": id, "warehouse": "prague", "size": 38, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/products/not-a-uuid"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url(&format!("/transfers/{}", UserId::new())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signed_adjustment_over_http() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let id = create_dress(&client, &srv, &admin, "Luna").await;
    let path = format!("/stock/brno/{id}/36");

    let adjust = |delta: i64| {
        client
            .post(srv.url("/stock/adjust"))
            .bearer_auth(&admin)
            .json(&json!({ "product_id": id, "warehouse": "brno", "size": 36, "delta": delta }))
            .send()
    };

    let res = adjust(4).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let record: Value = res.json().await.unwrap();
    assert_eq!(record["kind"], "inbound");
    assert_eq!(record["amount"], 4);

    let res = adjust(-3).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let record: Value = res.json().await.unwrap();
    assert_eq!(record["kind"], "outbound");
    assert_eq!(record["amount"], -3);

    let res = adjust(0).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_quantity");

    let res = adjust(-2).await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    assert_eq!(quantity(&client, &srv, &admin, &path).await, 1);
}

#[tokio::test]
async fn product_note_over_http() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let id = create_dress(&client, &srv, &admin, "Vera").await;

    let res = client
        .put(srv.url("/stock/note"))
        .bearer_auth(&admin)
        .json(&json!({ "product_id": id, "warehouse": "prague", "note": "window display" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url("/stock/note"))
        .bearer_auth(&admin)
        .json(&json!({ "product_id": id, "warehouse": "prague", "size": 40, "note": "stained" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/stock/prague/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["note"], "window display");

    let res = client
        .get(srv.url(&format!("/stock/prague/{id}/40")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["note"], "stained");

    let res = client
        .get(srv.url(&format!("/stock/brno/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body["note"].is_null());
}

#[tokio::test]
async fn inventory_count_reconciles_stock() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let prague = mint_jwt(SECRET, "jana", Role::Storekeeper, Some(Warehouse::Prague));

    let id = create_dress(&client, &srv, &admin, "Iris").await;
    client
        .post(srv.url("/stock/inbound"))
        .bearer_auth(&prague)
        .json(&json!({ "product_id": id, "warehouse": "prague", "size": 40, "quantity": 5 }))
        .send()
        .await
        .unwrap();

    let res = client
        .put(srv.url("/counts/draft"))
        .bearer_auth(&prague)
        .json(&json!({ "lines": [{ "product_id": id, "size": 40, "quantity": 2 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let draft: Value = res.json().await.unwrap();
    assert_eq!(draft["warehouse"], "prague");

    let res = client
        .post(srv.url("/counts/draft/preview"))
        .bearer_auth(&prague)
        .send()
        .await
        .unwrap();
    let preview: Value = res.json().await.unwrap();
    assert_eq!(preview[0]["old"], 5);
    assert_eq!(preview[0]["new"], 2);
    assert_eq!(preview[0]["delta"], -3);

    let res = client
        .post(srv.url("/counts/draft/confirm"))
        .bearer_auth(&prague)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let path = format!("/stock/prague/{id}/40");
    assert_eq!(quantity(&client, &srv, &prague, &path).await, 2);

    let res = client
        .get(srv.url("/history?user=jana&warehouse=prague"))
        .bearer_auth(&prague)
        .send()
        .await
        .unwrap();
    let history: Value = res.json().await.unwrap();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["kind"], "inventory-correction");
    assert_eq!(history[0]["amount"], -3);
}

#[tokio::test]
async fn basket_submit_creates_transfer() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let hub = mint_jwt(SECRET, "petr", Role::Storekeeper, Some(Warehouse::Pardubice));

    let id = create_dress(&client, &srv, &admin, "Luna").await;
    client
        .post(srv.url("/stock/inbound"))
        .bearer_auth(&hub)
        .json(&json!({ "product_id": id, "warehouse": "pardubice", "size": 36, "quantity": 3 }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(srv.url(&format!("/transfers/draft/products/{id}")))
        .bearer_auth(&hub)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url(&format!("/transfers/draft/products/{id}")))
        .bearer_auth(&hub)
        .json(&json!({ "quantities": [{ "size": 36, "quantity": 2 }] }))
        .send()
        .await
        .unwrap();
    let basket: Value = res.json().await.unwrap();
    assert_eq!(basket["total_units"], 2);
    assert_eq!(basket["source"], "pardubice");

    let res = client
        .post(srv.url("/transfers/draft/submit"))
        .bearer_auth(&hub)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let transfer: Value = res.json().await.unwrap();
    assert_eq!(transfer["target"], "prague");

    let res = client
        .get(srv.url("/transfers/draft"))
        .bearer_auth(&hub)
        .send()
        .await
        .unwrap();
    let basket: Value = res.json().await.unwrap();
    assert!(basket["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn user_directory_is_admin_only() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let keeper = mint_jwt(SECRET, "eva", Role::Storekeeper, Some(Warehouse::Brno));

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "username": "eva", "role": "storekeeper", "warehouse": "brno" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "username": "eva", "role": "storekeeper", "warehouse": "brno" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&keeper)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/staff/sales"))
        .bearer_auth(&keeper)
        .json(&json!({ "tries": 4, "sales": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(srv.url("/staff/sales"))
        .bearer_auth(&keeper)
        .send()
        .await
        .unwrap();
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["rows"][0]["username"], "eva");
    assert_eq!(summary["rows"][0]["success_rate_label"], "75.0 %");
}
