//! End-to-end auth and isolation flows against a running server.
//!
//! Requires the server on 127.0.0.1:8000 with a migrated Postgres
//! behind it, so everything here is `#[ignore]` by default:
//!
//!     cargo test --test auth_flow_e2e -- --ignored

use std::time::{SystemTime, UNIX_EPOCH};
use serde_json::{json, Value};

struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }

    fn unique_email(prefix: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{}_{}@example.com", prefix, timestamp)
    }

    async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/auth/register", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn register_then_login() {
    let context = TestContext::new();
    let email = TestContext::unique_email("alice");

    let reg = context.register(&email, "Passw0rd!").await;
    assert_eq!(reg.status().as_u16(), 201, "Registration failed");
    let reg_body: Value = reg.json().await.unwrap();
    assert!(!reg_body["access_token"].as_str().unwrap().is_empty());
    assert!(!reg_body["refresh_token"].as_str().unwrap().is_empty());
    let registered_id = reg_body["user"]["id"].as_str().unwrap().to_string();

    let bad = context.login(&email, "WrongPassw0rd!").await;
    assert_eq!(bad.status().as_u16(), 401, "Wrong password must be rejected");

    let good = context.login(&email, "Passw0rd!").await;
    assert_eq!(good.status().as_u16(), 200, "Login failed");
    let login_body: Value = good.json().await.unwrap();
    assert_eq!(login_body["user"]["id"].as_str().unwrap(), registered_id);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn me_returns_profile_without_secrets() {
    let context = TestContext::new();
    let email = TestContext::unique_email("profile");

    let reg = context.register(&email, "Passw0rd!").await;
    let body: Value = reg.json().await.unwrap();
    let access = body["access_token"].as_str().unwrap().to_string();
    let registered_id = body["user"]["id"].as_str().unwrap().to_string();

    let me = context
        .client
        .get(format!("{}/api/auth/me", context.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status().as_u16(), 200);
    let profile: Value = me.json().await.unwrap();
    assert_eq!(profile["id"].as_str().unwrap(), registered_id);
    assert_eq!(profile["email"].as_str().unwrap(), email.to_lowercase());
    assert!(profile.get("password_hash").is_none());
    assert!(profile.get("password").is_none());

    let anonymous = context
        .client
        .get(format!("{}/api/auth/me", context.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn duplicate_registration_conflicts() {
    let context = TestContext::new();
    let email = TestContext::unique_email("dup");

    assert_eq!(context.register(&email, "Passw0rd!").await.status().as_u16(), 201);
    assert_eq!(context.register(&email, "0therPassw0rd").await.status().as_u16(), 409);
    // Case-insensitive uniqueness.
    assert_eq!(
        context.register(&email.to_uppercase(), "Passw0rd!").await.status().as_u16(),
        409
    );
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn refresh_rotates_and_consumed_token_is_dead() {
    let context = TestContext::new();
    let email = TestContext::unique_email("rotator");

    let reg = context.register(&email, "Passw0rd!").await;
    let body: Value = reg.json().await.unwrap();
    let original_refresh = body["refresh_token"].as_str().unwrap().to_string();

    let refreshed = context
        .client
        .post(format!("{}/api/auth/refresh", context.base_url))
        .json(&json!({ "refresh_token": original_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(refreshed.status().as_u16(), 200, "Refresh failed");
    let new_pair: Value = refreshed.json().await.unwrap();
    assert_ne!(new_pair["refresh_token"].as_str().unwrap(), original_refresh);

    // Replaying the consumed token must fail: its session was revoked in
    // the rotation transaction.
    let replay = context
        .client
        .post(format!("{}/api/auth/refresh", context.base_url))
        .json(&json!({ "refresh_token": original_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status().as_u16(), 401, "Replayed refresh token must be rejected");
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn logout_is_idempotent() {
    let context = TestContext::new();
    let email = TestContext::unique_email("leaver");

    let reg = context.register(&email, "Passw0rd!").await;
    let body: Value = reg.json().await.unwrap();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let logout = context
            .client
            .post(format!("{}/api/auth/logout", context.base_url))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .unwrap();
        assert_eq!(logout.status().as_u16(), 204);
    }

    // The revoked session can no longer be refreshed.
    let refresh = context
        .client
        .post(format!("{}/api/auth/refresh", context.base_url))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(refresh.status().as_u16(), 401);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn logout_all_kills_every_device() {
    let context = TestContext::new();
    let email = TestContext::unique_email("multidevice");

    let reg = context.register(&email, "Passw0rd!").await;
    let body: Value = reg.json().await.unwrap();
    let refresh_one = body["refresh_token"].as_str().unwrap().to_string();
    let access = body["access_token"].as_str().unwrap().to_string();

    // Second device.
    let login = context.login(&email, "Passw0rd!").await;
    let body_two: Value = login.json().await.unwrap();
    let refresh_two = body_two["refresh_token"].as_str().unwrap().to_string();

    let logout_all = context
        .client
        .post(format!("{}/api/auth/logout-all", context.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(logout_all.status().as_u16(), 204);

    for refresh_token in [&refresh_one, &refresh_two] {
        let refresh = context
            .client
            .post(format!("{}/api/auth/refresh", context.base_url))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .unwrap();
        assert_eq!(refresh.status().as_u16(), 401, "Revoked session must not refresh");
    }
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn todos_are_isolated_between_users() {
    let context = TestContext::new();

    let reg_a = context.register(&TestContext::unique_email("owner"), "Passw0rd!").await;
    let body_a: Value = reg_a.json().await.unwrap();
    let token_a = body_a["access_token"].as_str().unwrap().to_string();

    let reg_b = context.register(&TestContext::unique_email("other"), "Passw0rd!").await;
    let body_b: Value = reg_b.json().await.unwrap();
    let token_b = body_b["access_token"].as_str().unwrap().to_string();

    let created = context
        .client
        .post(format!("{}/api/todos", context.base_url))
        .bearer_auth(&token_a)
        .json(&json!({ "title": "Buy groceries" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let todo: Value = created.json().await.unwrap();
    let todo_id = todo["id"].as_str().unwrap().to_string();

    // The owner sees it.
    let mine = context
        .client
        .get(format!("{}/api/todos/{}", context.base_url, todo_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(mine.status().as_u16(), 200);

    // Anyone else gets a 404, never a 403, on every operation.
    let theirs = context
        .client
        .get(format!("{}/api/todos/{}", context.base_url, todo_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(theirs.status().as_u16(), 404);

    let foreign_update = context
        .client
        .put(format!("{}/api/todos/{}", context.base_url, todo_id))
        .bearer_auth(&token_b)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign_update.status().as_u16(), 404);

    let foreign_delete = context
        .client
        .delete(format!("{}/api/todos/{}", context.base_url, todo_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign_delete.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn protected_routes_reject_bad_bearer_tokens() {
    let context = TestContext::new();

    // No header at all.
    let missing = context
        .client
        .get(format!("{}/api/todos", context.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 401);

    // Garbage token.
    let garbage = context
        .client
        .get(format!("{}/api/todos", context.base_url))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status().as_u16(), 401);

    // A refresh token is not an access token.
    let reg = context.register(&TestContext::unique_email("confused"), "Passw0rd!").await;
    let body: Value = reg.json().await.unwrap();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    let wrong_kind = context
        .client
        .get(format!("{}/api/todos", context.base_url))
        .bearer_auth(&refresh_token)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_kind.status().as_u16(), 401);
}
