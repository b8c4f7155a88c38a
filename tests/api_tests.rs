// tests/api_tests.rs

use std::sync::Arc;

use exam_portal::{config::Config, routes, state::AppState, store::MemoryStore};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // 1. Create test configuration and an empty in-memory store
    let config = Config::for_testing("test_secret_for_integration_tests");
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        config,
    };

    // 2. Create the router with the app state
    let app = routes::create_router(state);

    // 3. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 4. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers and logs in; returns the bearer token.
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    username: &str,
    role: &str,
) -> String {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "role": role
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    assert_eq!(login["role"], role);
    login["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works_and_hides_password() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": unique_name("u"),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["role"], "student");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("dup");

    let mut statuses = Vec::new();
    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/auth/register", address))
            .json(&serde_json::json!({"username": username, "password": "password123"}))
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![201, 409]);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");
    register_and_login(&client, &address, &username, "student").await;

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": "wrong-password"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn routes_are_gated_by_token_and_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let student = register_and_login(&client, &address, &unique_name("s"), "student").await;
    let teacher = register_and_login(&client, &address, &unique_name("t"), "teacher").await;

    // No token
    let response = client
        .get(format!("{}/api/exams", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Garbage token
    let response = client
        .get(format!("{}/api/exams", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Student on a teacher route
    let response = client
        .get(format!("{}/api/teacher/questions", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Teacher on a student route
    let response = client
        .get(format!("{}/api/student/results", address))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Both roles may list exams
    for token in [&student, &teacher] {
        let response = client
            .get(format!("{}/api/exams", address))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }
}

#[tokio::test]
async fn profile_rename_and_password_change() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, &unique_name("p"), "student").await;
    let new_name = unique_name("renamed");

    // Blank display name is rejected
    let response = client
        .put(format!("{}/api/profile/username", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({"username": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .put(format!("{}/api/profile/username", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({"username": new_name}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], new_name.as_str());

    // Mismatched confirmation
    let response = client
        .put(format!("{}/api/profile/password", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "new_password": "brand-new-pass",
            "confirm_password": "brand-new-pasS"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .put(format!("{}/api/profile/password", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "new_password": "brand-new-pass",
            "confirm_password": "brand-new-pass"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": new_name, "password": "brand-new-pass"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}
