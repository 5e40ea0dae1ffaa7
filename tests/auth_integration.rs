use std::net::TcpListener;
use std::sync::Arc;

use homi_auth::auth::token::{self, TokenType};
use homi_auth::configuration::AuthSettings;
use homi_auth::startup::run;
use homi_auth::store::UserStore;
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub store: Arc<UserStore>,
    pub settings: AuthSettings,
}

fn test_settings() -> AuthSettings {
    AuthSettings {
        access_token_secret: "test-access-secret-at-least-32-chars".to_string(),
        refresh_token_secret: "test-refresh-secret-at-least-32-chars".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 604_800,
        // Low iteration count keeps the test suite fast
        auth_pbkdf2_iterations: 1_000,
        auth_pbkdf2_digest: "sha512".to_string(),
        auth_pbkdf2_key_length: 64,
        max_refresh_tokens: 5,
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(UserStore::new());
    let settings = test_settings();

    let server = run(listener, store.clone(), settings.clone()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        settings,
    }
}

async fn register_user(app: &TestApp, email: &str) -> Value {
    let client = reqwest::Client::new();
    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({
            "email": email,
            "password": "Password123!",
            "firstName": "Anna",
            "lastName": "Lee"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_with_token_envelope() {
    let app = spawn_app().await;

    let body = register_user(&app, "a@b.com").await;

    assert_eq!(body["tokenType"], "Bearer");
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
    assert!(body["accessTokenExpiresAt"].as_i64().unwrap() > 0);
    assert!(
        body["refreshTokenExpiresAt"].as_i64().unwrap()
            > body["accessTokenExpiresAt"].as_i64().unwrap()
    );
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["user"]["firstName"], "Anna");
    assert!(body["user"].get("passwordHash").is_none());

    // The stored record is a salted hash, never the raw password
    let user = app
        .store
        .find_by_email("a@b.com")
        .unwrap()
        .expect("User should exist");
    assert!(!user.password_hash.is_empty());
    assert_ne!(user.password_hash, "Password123!");
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_bodies = vec![
        json!({ "email": "", "password": "Password123!" }),
        json!({ "email": "notanemail", "password": "Password123!" }),
        json!({ "email": "a@b.com", "password": "" }),
        json!({ "email": "a@b.com", "password": "short1!" }),
    ];

    for body in invalid_bodies {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject body: {}",
            body
        );
    }
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "a@b.com").await;

    // Same address with different case and whitespace
    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({ "email": "  A@B.COM ", "password": "Password123!" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
}

// --- Login ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "a@b.com").await;

    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "a@b.com", "password": "Password123!" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["tokenType"], "Bearer");
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_failure_does_not_reveal_whether_the_email_exists() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "a@b.com").await;

    let wrong_password = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "a@b.com", "password": "WrongPass!1" }))
        .send()
        .await
        .expect("Failed to execute request.");
    let unknown_email = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "ghost@b.com", "password": "WrongPass!1" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let wrong_body: Value = wrong_password.json().await.unwrap();
    let unknown_body: Value = unknown_email.json().await.unwrap();
    assert_eq!(wrong_body["message"], unknown_body["message"]);
    assert_eq!(wrong_body["code"], unknown_body["code"]);
}

// --- Token refresh and rotation ---

#[tokio::test]
async fn refresh_token_is_single_use() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let refresh_token = registered["refreshToken"].as_str().unwrap();

    let first = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, first.status().as_u16());

    let first_body: Value = first.json().await.unwrap();
    assert_ne!(first_body["refreshToken"].as_str().unwrap(), refresh_token);

    // Replaying the consumed token fails
    let second = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, second.status().as_u16());

    // The replacement from the first rotation still works
    let rotated = first_body["refreshToken"].as_str().unwrap();
    let third = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refreshToken": rotated }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, third.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_garbage_and_access_tokens() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let access_token = registered["accessToken"].as_str().unwrap();

    for bad_token in ["", "garbage", "a.b.c", access_token] {
        let response = client
            .post(&format!("{}/auth/refresh", &app.address))
            .json(&json!({ "refreshToken": bad_token }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            401,
            response.status().as_u16(),
            "Should reject token: {:?}",
            bad_token
        );
    }
}

#[tokio::test]
async fn refresh_records_per_user_never_exceed_the_bound() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "a@b.com").await;

    for _ in 0..8 {
        let response = client
            .post(&format!("{}/auth/login", &app.address))
            .json(&json!({ "email": "a@b.com", "password": "Password123!" }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }

    let user = app
        .store
        .find_by_email("a@b.com")
        .unwrap()
        .expect("User should exist");
    assert!(user.refresh_tokens.len() <= app.settings.max_refresh_tokens);
}

// --- Logout ---

#[tokio::test]
async fn logout_always_returns_200() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let refresh_token = registered["refreshToken"].as_str().unwrap().to_string();

    let bodies = vec![
        json!({ "refreshToken": refresh_token }),
        // Repeated logout with the now-revoked token
        json!({ "refreshToken": refresh_token }),
        json!({ "refreshToken": "garbage" }),
        json!({ "refreshToken": "" }),
        json!({}),
    ];

    for body in bodies {
        let response = client
            .post(&format!("{}/auth/logout", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16(), "Body: {}", body);
        let response_body: Value = response.json().await.unwrap();
        assert_eq!(response_body["message"], "Logged out");
    }
}

#[tokio::test]
async fn logged_out_refresh_token_no_longer_refreshes() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let refresh_token = registered["refreshToken"].as_str().unwrap();

    let logout = client
        .post(&format!("{}/auth/logout", &app.address))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, logout.status().as_u16());

    let refresh = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, refresh.status().as_u16());
}

// --- Current user ---

#[tokio::test]
async fn me_returns_the_authenticated_user() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let access_token = registered["accessToken"].as_str().unwrap();

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["user"]["firstName"], "Anna");
    assert_eq!(body["user"]["lastName"], "Lee");
}

#[tokio::test]
async fn me_returns_401_without_a_valid_bearer_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "a@b.com").await;

    // No header
    let missing = client
        .get(&format!("{}/auth/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, missing.status().as_u16());

    // Wrong scheme
    let wrong_scheme = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", "Basic abc123")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, wrong_scheme.status().as_u16());

    // Garbage token
    let garbage = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", "Bearer not.a.token")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, garbage.status().as_u16());
}

#[tokio::test]
async fn me_returns_401_for_an_expired_access_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let user_id = registered["user"]["id"].as_str().unwrap();

    // Mint an already-expired access token with the app's own secret
    let expired = token::sign(
        user_id,
        TokenType::Access,
        &app.settings.access_token_secret,
        -1,
    )
    .expect("Failed to sign token");

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", expired.token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_returns_401_for_a_refresh_token_in_the_bearer_slot() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_user(&app, "a@b.com").await;
    let refresh_token = registered["refreshToken"].as_str().unwrap();

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}
