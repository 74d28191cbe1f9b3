//! In-process router tests over an in-memory SQLite store.

use std::str::FromStr;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use famledger_api::service::ServiceConfig;
use famledger_server::{AppState, app};

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let store = famledger_store::in_memory().await.unwrap();
        let config = ServiceConfig {
            jwt_secret: "router-test-secret".into(),
            password_iterations: 1_000,
            ..Default::default()
        };
        let state = AppState::new(store.repos, config, store.backend);
        Self {
            router: app(state, &[]),
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Register a family and return the admin's access token.
    async fn register(&self, family: &str, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/families",
                None,
                Some(json!({
                    "family_name": family,
                    "email": email,
                    "password": "password1",
                    "first_name": "Ann",
                    "last_name": family,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["auth"]["access_token"].as_str().unwrap().to_string()
    }

    async fn category(&self, token: &str, name: &str, kind: &str) -> String {
        let (status, body) = self
            .post(
                "/api/categories",
                token,
                json!({"name": name, "category_type": kind}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

fn decimal(v: &Value) -> Decimal {
    match v {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

#[tokio::test]
async fn health_reports_backend() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "sqlite");
}

#[tokio::test]
async fn register_login_and_budget_summary() {
    let app = TestApp::new().await;
    app.register("Smith", "a@b.com").await;

    let (status, login) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "a@b.com", "password": "password1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{login}");
    assert_eq!(login["token_type"], "Bearer");
    let token = login["access_token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["family"]["name"], "Smith");
    assert_eq!(me["user"]["role"], "admin");

    let food = app.category(&token, "Food", "expense").await;
    let (status, tx) = app
        .post(
            "/api/transactions",
            &token,
            json!({
                "category_id": food,
                "amount": 100.50,
                "transaction_type": "expense",
                "description": "groceries",
                "date": "2024-01-15",
                "tags": ["Weekly"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tx}");
    assert_eq!(decimal(&tx["amount"]), Decimal::new(10050, 2));
    assert_eq!(tx["tags"], json!(["weekly"]));

    let (status, budget) = app
        .post(
            "/api/budgets",
            &token,
            json!({
                "name": "Groceries",
                "category_id": food,
                "amount": "500",
                "period": "monthly",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{budget}");

    let uri = format!("/api/budgets/{}/summary", budget["id"].as_str().unwrap());
    let (status, summary) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK, "{summary}");
    assert_eq!(decimal(&summary["spent"]), Decimal::new(10050, 2));
    assert_eq!(decimal(&summary["remaining"]), Decimal::new(39950, 2));
    assert_eq!(summary["is_over_budget"], false);

    let (status, listed) = app
        .get("/api/transactions?type=expense&start_date=2024-01-01&limit=10", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(listed["limit"], 10);

    let (status, stats) = app.get("/api/family/stats", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["transaction_count"], 1);
}

#[tokio::test]
async fn requests_without_valid_token_are_401() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/api/family", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Authorization"));

    let (status, body) = app.get("/api/family", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let app = TestApp::new().await;
    let token = app.register("Smith", "a@b.com").await;

    let (status, body) = app.get("/api/transactions/not-a-uuid", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/categories")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/transactions?type=transfer", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("transaction type"), "{body}");

    let (status, body) = app
        .post(
            "/api/categories",
            &token,
            json!({"name": "  ", "category_type": "expense"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn oversized_amount_filters_are_rejected() {
    let app = TestApp::new().await;
    let token = app.register("Smith", "a@b.com").await;

    let (status, body) = app
        .get("/api/transactions?min_amount=79228162514264337593543950335", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().unwrap().contains("min_amount"), "{body}");

    let (status, _) = app.get("/api/transactions?max_amount=-5", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The server is still serving afterwards.
    let (status, body) = app
        .get("/api/transactions?min_amount=0&max_amount=999999999.99", &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn invite_accept_and_child_permissions() {
    let app = TestApp::new().await;
    let admin = app.register("Smith", "a@b.com").await;

    let (status, invite) = app
        .post(
            "/api/invites",
            &admin,
            json!({"email": "kid@b.com", "role": "child"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invite}");
    let token = invite["token"].as_str().unwrap().to_string();

    let (status, preview) = app
        .call(Method::GET, &format!("/api/invites/token/{token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["family_name"], "Smith");
    assert_eq!(preview["role"], "child");

    let accept = format!("/api/invites/token/{token}/accept");
    let signup = json!({"password": "password2", "first_name": "Kid", "last_name": "Smith"});
    let (status, joined) = app
        .call(Method::POST, &accept, None, Some(signup.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{joined}");
    let child = joined["auth"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = app.call(Method::POST, &accept, None, Some(signup)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/categories",
            &child,
            json!({"name": "Toys", "category_type": "expense"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/api/invites/sweep", &child, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, swept) = app.post("/api/invites/sweep", &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(swept["expired"], 0);

    let (status, users) = app.get("/api/users", &child).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn other_families_get_404() {
    let app = TestApp::new().await;
    let smith = app.register("Smith", "a@b.com").await;
    let jones = app.register("Jones", "j@b.com").await;

    let food = app.category(&smith, "Food", "expense").await;
    let (status, tx) = app
        .post(
            "/api/transactions",
            &smith,
            json!({
                "category_id": food,
                "amount": "12",
                "transaction_type": "expense",
                "date": "2024-01-09",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tx}");

    let uri = format!("/api/transactions/{}", tx["id"].as_str().unwrap());
    let (status, body) = app.get(&uri, &jones).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "transaction not found");

    let (status, _) = app.call(Method::DELETE, &uri, Some(&jones), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, &smith).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reports_are_generated_and_listed() {
    let app = TestApp::new().await;
    let token = app.register("Smith", "a@b.com").await;
    let food = app.category(&token, "Food", "expense").await;
    for amount in ["30", "70"] {
        let (status, _) = app
            .post(
                "/api/transactions",
                &token,
                json!({
                    "category_id": food,
                    "amount": amount,
                    "transaction_type": "expense",
                    "date": "2024-03-02",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, report) = app
        .post(
            "/api/reports",
            &token,
            json!({
                "name": "March",
                "report_type": "expenses",
                "period": "monthly",
                "start_date": "2024-03-01",
                "end_date": "2024-03-31",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    assert_eq!(decimal(&report["data"]["total_expenses"]), Decimal::from(100));
    assert_eq!(report["data"]["category_breakdown"][0]["category_name"], "Food");

    let (status, listed) = app.get("/api/reports", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["reports"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_the_family_revokes_access() {
    let app = TestApp::new().await;
    let token = app.register("Smith", "a@b.com").await;
    let (status, body) = app.call(Method::DELETE, "/api/family", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, _) = app.get("/api/family", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
