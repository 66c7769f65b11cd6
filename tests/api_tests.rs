// tests/api_tests.rs

use examhub::{config::Config, routes, session::SessionRegistry, state::AppState};
use examhub::utils::hash::hash_password;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the pool,
/// which shares the single in-memory database with the server.
async fn spawn_app() -> (String, SqlitePool) {
    // Foreign keys on, as in the production connection.
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // One connection, kept alive forever: an in-memory SQLite database
    // lives and dies with its connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        sessions: SessionRegistry::new(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Inserts a user directly and returns a fresh login token.
async fn seed_user_and_login(
    address: &str,
    pool: &SqlitePool,
    email: &str,
    role: &str,
    class_level: Option<&str>,
) -> String {
    let password = "password123";
    let hashed = hash_password(password).unwrap();

    sqlx::query(
        "INSERT INTO users (email, password, full_name, role, class_level) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(email)
    .bind(&hashed)
    .bind("Test User")
    .bind(role)
    .bind(class_level)
    .execute(pool)
    .await
    .expect("Failed to seed user");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute login");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let (address, _pool) = spawn_app().await;
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
async fn register_works() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "student@example.com",
            "password": "password123",
            "full_name": "New Student"
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
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: password too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "short@example.com",
            "password": "abc",
            "full_name": "Shorty"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "email": "dup@example.com",
        "password": "password123",
        "full_name": "Dup"
    });

    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (address, pool) = spawn_app().await;
    let _token = seed_user_and_login(&address, &pool, "u1@example.com", "student", None).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": "u1@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn quiz_routes_require_teacher_role() {
    let (address, pool) = spawn_app().await;
    let student_token =
        seed_user_and_login(&address, &pool, "s@example.com", "student", Some("T1")).await;
    let client = reqwest::Client::new();

    // No token at all
    let response = client
        .get(format!("{}/api/quizzes", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Student token on a teacher route
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({
            "title": "Nope",
            "time_limit": 10,
            "target_class": "T1",
            "questions": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

fn sample_quiz_payload() -> serde_json::Value {
    serde_json::json!({
        "title": "History of Rome",
        "description": "Short check",
        "time_limit": 15,
        "target_class": "T1",
        "questions": [
            {
                "text": "When was Rome founded?",
                "explanation": "Traditional date.",
                "options": [
                    { "text": "753 BC", "is_correct": true },
                    { "text": "509 BC", "is_correct": false }
                ]
            },
            {
                "text": "First emperor?",
                "options": [
                    { "text": "Augustus", "is_correct": true },
                    { "text": "Nero", "is_correct": false }
                ]
            }
        ]
    })
}

#[tokio::test]
async fn quiz_crud_round_trip() {
    let (address, pool) = spawn_app().await;
    let teacher_token =
        seed_user_and_login(&address, &pool, "t@example.com", "teacher", None).await;
    // The teacher needs a school to author under.
    sqlx::query("INSERT INTO schools (name, city) VALUES ('Lycee Test', 'Paris')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE users SET school_id = 1 WHERE email = 't@example.com'")
        .execute(&pool)
        .await
        .unwrap();

    let client = reqwest::Client::new();

    // Create
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&teacher_token)
        .json(&sample_quiz_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    let quiz_id = created["id"].as_i64().unwrap();
    assert_eq!(created["status"], "Active");

    // List shows counts
    let response = client
        .get(format!("{}/api/quizzes", address))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = response.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["question_count"], 2);
    assert_eq!(listed[0]["result_count"], 0);

    // Detail includes the full tree with correct flags
    let response = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let detail: serde_json::Value = response.json().await.unwrap();
    assert_eq!(detail["questions"].as_array().unwrap().len(), 2);
    assert_eq!(detail["questions"][0]["options"][0]["is_correct"], true);

    // Update replaces the question set
    let mut updated = sample_quiz_payload();
    updated["title"] = serde_json::json!("History of Rome II");
    updated["questions"].as_array_mut().unwrap().remove(1);
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&teacher_token)
        .json(&updated)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .unwrap();
    let detail: serde_json::Value = response.json().await.unwrap();
    assert_eq!(detail["title"], "History of Rome II");
    assert_eq!(detail["questions"].as_array().unwrap().len(), 1);

    // Delete
    let response = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn teacher_cannot_touch_foreign_quiz() {
    let (address, pool) = spawn_app().await;
    let owner_token =
        seed_user_and_login(&address, &pool, "owner@example.com", "teacher", None).await;
    let other_token =
        seed_user_and_login(&address, &pool, "other@example.com", "teacher", None).await;
    sqlx::query("INSERT INTO schools (name) VALUES ('S1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE users SET school_id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&owner_token)
        .json(&sample_quiz_payload())
        .send()
        .await
        .unwrap();
    let quiz_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn deleting_referenced_users_and_schools_succeeds() {
    let (address, pool) = spawn_app().await;
    let admin_token = seed_user_and_login(&address, &pool, "a@example.com", "admin", None).await;
    let teacher_token =
        seed_user_and_login(&address, &pool, "t@example.com", "teacher", None).await;
    sqlx::query("INSERT INTO schools (name) VALUES ('S1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE users SET school_id = 1 WHERE email = 't@example.com'")
        .execute(&pool)
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&teacher_token)
        .json(&sample_quiz_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Deleting the teacher takes their quizzes and questions with them
    let teacher_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = 't@example.com'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let response = client
        .delete(format!("{}/api/admin/users/{}", address, teacher_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let quizzes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(quizzes, 0);
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(questions, 0);

    // Deleting a school detaches its remaining members
    sqlx::query("UPDATE users SET school_id = 1 WHERE email = 'a@example.com'")
        .execute(&pool)
        .await
        .unwrap();
    let response = client
        .delete(format!("{}/api/admin/schools/1", address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let school_id: Option<i64> =
        sqlx::query_scalar("SELECT school_id FROM users WHERE email = 'a@example.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(school_id, None);
}

#[tokio::test]
async fn admin_manages_users_and_schools() {
    let (address, pool) = spawn_app().await;
    let admin_token = seed_user_and_login(&address, &pool, "a@example.com", "admin", None).await;
    let client = reqwest::Client::new();

    // Create a school
    let response = client
        .post(format!("{}/api/admin/schools", address))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Lycee Central", "city": "Lyon" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let school: serde_json::Value = response.json().await.unwrap();
    let school_id = school["id"].as_i64().unwrap();

    // Public school listing
    let response = client
        .get(format!("{}/api/schools", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.json::<serde_json::Value>().await.unwrap()[0]["name"],
        "Lycee Central"
    );

    // Create a teacher attached to it
    let response = client
        .post(format!("{}/api/admin/users", address))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "email": "teach@example.com",
            "password": "password123",
            "full_name": "Prof",
            "role": "teacher",
            "school_id": school_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let teacher: serde_json::Value = response.json().await.unwrap();
    let teacher_id = teacher["id"].as_i64().unwrap();

    // Update role validation
    let response = client
        .put(format!("{}/api/admin/users/{}", address, teacher_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "role": "superhero" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Overview counts
    let response = client
        .get(format!("{}/api/admin/overview", address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let overview: serde_json::Value = response.json().await.unwrap();
    assert_eq!(overview["users"], 2);
    assert_eq!(overview["schools"], 1);
    assert_eq!(overview["results"], 0);

    // Delete the teacher
    let response = client
        .delete(format!("{}/api/admin/users/{}", address, teacher_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // Admin routes are closed to non-admins
    let student_token =
        seed_user_and_login(&address, &pool, "s2@example.com", "student", None).await;
    let response = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
