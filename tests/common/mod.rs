#![allow(dead_code)]

use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use supernova::router::init_router;
use supernova::state::AppState;
use supernova_config::{CorsConfig, EmailConfig, JwtConfig, RateLimitConfig};
use supernova_core::hash_password;

pub const PASSWORD: &str = "password123";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub school_id: Option<Uuid>,
}

pub fn test_state(pool: PgPool, rate_limit_config: RateLimitConfig) -> AppState {
    AppState {
        db: pool,
        jwt_config: JwtConfig::with_secret("integration-test-secret"),
        email_config: EmailConfig::disabled(),
        cors_config: CorsConfig::from_list("http://localhost:3000"),
        rate_limit_config,
        cache: None,
        started_at: Instant::now(),
    }
}

pub fn setup_test_app(pool: PgPool) -> Router {
    init_router(test_state(pool, RateLimitConfig::permissive()))
}

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

pub async fn create_school(pool: &PgPool) -> Uuid {
    let code = unique("SCH").to_uppercase();
    sqlx::query_scalar(
        "INSERT INTO schools (name, code, domain, contact_email, timezone, max_students, max_teachers)
         VALUES ($1, $2, $3, $4, 'UTC', 100, 10)
         RETURNING id",
    )
    .bind(format!("School {}", code))
    .bind(&code)
    .bind(format!("{}.school.test", code.to_lowercase()))
    .bind(format!("office@{}.school.test", code.to_lowercase()))
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Inserts a user with role `role` and the shared test password.
pub async fn create_user(pool: &PgPool, role: &str, school_id: Option<Uuid>) -> TestUser {
    let email = format!("{}@test.dev", unique(role));
    let hashed = hash_password(PASSWORD).unwrap();
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password, first_name, last_name, role, school_id)
         VALUES ($1, $2, 'Test', 'User', $3::user_role, $4)
         RETURNING id",
    )
    .bind(&email)
    .bind(&hashed)
    .bind(role)
    .bind(school_id)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        email,
        school_id,
    }
}

pub struct TestCourse {
    pub id: Uuid,
    pub content_id: Uuid,
    pub module_id: Uuid,
    pub lesson_ids: Vec<Uuid>,
}

/// A published course with a current version holding one module of
/// `lessons` lessons.
pub async fn create_course(
    pool: &PgPool,
    created_by: Uuid,
    b2b: bool,
    d2c: bool,
    base_price: Option<f64>,
    lessons: usize,
) -> TestCourse {
    let code = unique("CRS").to_uppercase();
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO courses (title, description, code, status, is_b2b_enabled, is_d2c_enabled,
                              base_price, currency, created_by_id)
         VALUES ($1, 'A test course', $2, 'published', $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(format!("Course {}", code))
    .bind(&code)
    .bind(b2b)
    .bind(d2c)
    .bind(base_price)
    .bind(base_price.map(|_| "USD"))
    .bind(created_by)
    .fetch_one(pool)
    .await
    .unwrap();

    let content_id: Uuid = sqlx::query_scalar(
        "INSERT INTO course_contents (start_date, end_date, content_status)
         VALUES (NOW(), NOW() + INTERVAL '90 days', 'published')
         RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO course_versions (course_id, version, content_id) VALUES ($1, '1.0', $2)")
        .bind(id)
        .bind(content_id)
        .execute(pool)
        .await
        .unwrap();

    let module_id: Uuid = sqlx::query_scalar(
        "INSERT INTO modules (content_id, title, sequence_number) VALUES ($1, 'Basics', 1) RETURNING id",
    )
    .bind(content_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let mut lesson_ids = Vec::with_capacity(lessons);
    for n in 1..=lessons {
        let lesson_id: Uuid = sqlx::query_scalar(
            "INSERT INTO lessons (module_id, title, sequence_number, content_type)
             VALUES ($1, $2, $3, 'text')
             RETURNING id",
        )
        .bind(module_id)
        .bind(format!("Lesson {}", n))
        .bind(n as i32)
        .fetch_one(pool)
        .await
        .unwrap();
        lesson_ids.push(lesson_id);
    }

    TestCourse {
        id,
        content_id,
        module_id,
        lesson_ids,
    }
}

pub async fn grant_license(
    pool: &PgPool,
    course_id: Uuid,
    school_id: Uuid,
    granted_by: Uuid,
    max_students: Option<i32>,
) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO course_licenses (course_id, school_id, granted_by_id, max_students)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(course_id)
    .bind(school_id)
    .bind(granted_by)
    .bind(max_students)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "10.0.0.1");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}
