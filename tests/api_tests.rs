// tests/api_tests.rs

use sman1_backend::{
    config::Config,
    models::user::{Role, User},
    routes,
    state::AppState,
    store::{Store, keys},
    utils::hash::hash_password,
};
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
///
/// Each app gets its own in-memory database, seeded with one admin
/// account (admin / admin123).
async fn spawn_app() -> String {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    let store = Store::new(pool);
    store
        .init_schema()
        .await
        .expect("Failed to initialize storage schema");

    let admin = User {
        id: "admin_1".to_string(),
        name: "Administrator".to_string(),
        email: None,
        username: "admin".to_string(),
        password: hash_password("admin123").expect("Failed to hash password"),
        role: Role::Admin,
        nis: None,
        nip: None,
        mata_pelajaran: None,
        kelas: None,
        status: "active".to_string(),
        created_by: None,
        created_at: chrono::Utc::now(),
        updated_at: None,
    };
    store.save(keys::USERS, &[admin]).await.unwrap();

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState { store, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str, role: &str) -> String {
    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "role": role
        }))
        .send()
        .await
        .expect("Login request failed");
    assert_eq!(resp.status().as_u16(), 200, "login should succeed");

    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().expect("Token not found").to_string()
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
async fn login_returns_token_and_profile() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": "admin",
            "password": "admin123",
            "role": "admin"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["user"]["role"], "admin");
    // The hash must never be serialized into a response.
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": "admin",
            "password": "wrong",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn login_is_scoped_by_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Correct credentials, wrong role picker.
    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": "admin",
            "password": "admin123",
            "role": "guru"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_creates_and_filters_users() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    // Create a teacher
    let resp = client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "Diana Sari, S.Pd.",
            "username": "guru001",
            "password": "guru123",
            "role": "guru",
            "mataPelajaran": "Matematika"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let teacher: serde_json::Value = resp.json().await.unwrap();
    assert!(teacher["id"].as_str().unwrap().starts_with("guru_"));
    assert!(teacher["nip"].as_str().is_some());

    // Create a student
    let resp = client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "Ahmad Fauzi",
            "username": "20210001",
            "password": "siswa123",
            "role": "siswa",
            "kelas": "XII IPA 1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let student: serde_json::Value = resp.json().await.unwrap();
    assert!(student["nis"].as_str().is_some());

    // Duplicate username is a conflict
    let resp = client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "Duplicate",
            "username": "guru001",
            "password": "guru123",
            "role": "guru"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    // Role filter
    let listed: serde_json::Value = client
        .get(format!("{}/api/admin/users?role=siswa", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "Ahmad Fauzi");

    // Free-text search
    let found: serde_json::Value = client
        .get(format!("{}/api/admin/users?q=diana", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, "admin", "admin123", "admin").await;

    // No token at all
    let resp = client
        .get(format!("{}/api/admin/users", address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // A teacher token is not enough
    client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "name": "Budi Santoso, S.Pd.",
            "username": "guru002",
            "password": "guru123",
            "role": "guru"
        }))
        .send()
        .await
        .unwrap();
    let guru_token = login(&client, &address, "guru002", "guru123", "guru").await;

    let resp = client
        .get(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", guru_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_cannot_delete_self() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    let resp = client
        .delete(format!("{}/api/admin/users/admin_1", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn settings_roundtrip() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    let resp = client
        .put(format!("{}/api/admin/settings", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "schoolName": "SMAN 1 Parengan",
            "schoolAddress": "Jl. Raya Parengan",
            "schoolPhone": "0356-123456",
            "schoolEmail": "info@sman1parengan.sch.id",
            "academicYear": "2025/2026",
            "semester": "ganjil",
            "maxStudents": 36,
            "gradeScale": "0-100"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let saved: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(saved["updatedBy"], "Administrator");

    let loaded: serde_json::Value = client
        .get(format!("{}/api/admin/settings", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(loaded["schoolName"], "SMAN 1 Parengan");
    assert_eq!(loaded["maxStudents"], 36);
}

#[tokio::test]
async fn backup_and_restore_roundtrip() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    // Give the backup something to carry
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let created: serde_json::Value = client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "Siti Rahma",
            "username": unique_name,
            "password": "siswa123",
            "role": "siswa",
            "kelas": "XII IPA 1"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let created_id = created["id"].as_str().unwrap().to_string();

    let backup: serde_json::Value = client
        .get(format!("{}/api/admin/backup", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(backup["users"].as_array().unwrap().len(), 2);
    assert_eq!(backup["backedUpBy"], "Administrator");

    // Lose the student, then restore the bundle
    let resp = client
        .delete(format!("{}/api/admin/users/{}", address, created_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .post(format!("{}/api/admin/restore", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&backup)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let listed: serde_json::Value = client
        .get(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn export_has_all_three_sections() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "Ahmad Fauzi",
            "username": "20210001",
            "password": "siswa123",
            "role": "siswa",
            "kelas": "XII IPA 1"
        }))
        .send()
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/api/admin/export", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(
        resp.headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );

    let body = resp.text().await.unwrap();
    assert!(body.contains("DATA SISWA"));
    assert!(body.contains("DATA GURU"));
    assert!(body.contains("DATA NILAI"));
    assert!(body.contains("Ahmad Fauzi"));
}

#[tokio::test]
async fn stats_count_roles_and_storage() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "Ahmad Fauzi",
            "username": "20210001",
            "password": "siswa123",
            "role": "siswa",
            "kelas": "XII IPA 1"
        }))
        .send()
        .await
        .unwrap();

    let stats: serde_json::Value = client
        .get(format!("{}/api/admin/stats", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["totalUsers"], 2);
    assert_eq!(stats["totalStudents"], 1);
    assert_eq!(stats["totalAdmins"], 1);
    assert_eq!(stats["totalExams"], 0);
    assert_eq!(stats["activeExams"], 0);
    assert!(stats["storageUsage"].as_u64().unwrap() <= 100);
}

#[tokio::test]
async fn cleanup_on_fresh_data_removes_nothing() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    let result: serde_json::Value = client
        .post(format!("{}/api/admin/cleanup", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["removedExams"], 0);
    assert_eq!(result["removedGrades"], 0);
}

#[tokio::test]
async fn report_carries_defaults_and_summary() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    let report: serde_json::Value = client
        .get(format!("{}/api/admin/report", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["type"], "academic");
    assert_eq!(report["period"], "monthly");
    assert_eq!(report["generatedBy"], "Administrator");
    assert_eq!(report["summary"]["totalStudents"], 0);
    assert_eq!(report["summary"]["averageGrade"], 0.0);
}

#[tokio::test]
async fn me_returns_own_profile() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123", "admin").await;

    let me: serde_json::Value = client
        .get(format!("{}/api/auth/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(me["username"], "admin");
    assert_eq!(me["role"], "admin");
    assert!(me.get("password").is_none());
}
