mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;

use common::{PASSWORD, create_school, create_user, login, send, setup_test_app};

fn school_payload(code: &str, admin_email: &str) -> Value {
    json!({
        "name": "Lagos High School",
        "code": code,
        "domain": format!("{}.supernova.dev", code.to_lowercase()),
        "contact_email": "office@lagos-hs.dev",
        "timezone": "Africa/Lagos",
        "max_students": 500,
        "max_teachers": 40,
        "admin": {
            "email": admin_email,
            "password": PASSWORD,
            "first_name": "Head",
            "last_name": "Teacher"
        }
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_school_with_admin(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &root.email).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/schools",
        Some(&token),
        Some(school_payload("LAGOS-HS", "head@lagos-hs.dev")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["code"], "LAGOS-HS");
    let school_id = body["id"].as_str().unwrap().to_string();

    let (role, admin_school): (String, Option<uuid::Uuid>) = sqlx::query_as(
        "SELECT role::text, school_id FROM users WHERE email = 'head@lagos-hs.dev'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(role, "school_admin");
    assert_eq!(admin_school.unwrap().to_string(), school_id);

    // The new admin can log in and sees their school
    let admin_token = login(&app, "head@lagos-hs.dev").await;
    let (status, body) = send(&app, "GET", "/api/v1/schools/me", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], school_id);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_school_code_conflicts(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &root.email).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/schools",
        Some(&token),
        Some(school_payload("ABUJA-HS", "first@abuja-hs.dev")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/schools",
        Some(&token),
        Some(school_payload("ABUJA-HS", "second@abuja-hs.dev")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The failed attempt must not leave its admin behind
    let orphan: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = 'second@abuja-hs.dev')")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!orphan);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_super_admin_creates_schools(pool: PgPool) {
    let school_id = create_school(&pool).await;
    let admin = create_user(&pool, "school_admin", Some(school_id)).await;
    let app = setup_test_app(pool);
    let token = login(&app, &admin.email).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/schools",
        Some(&token),
        Some(school_payload("KANO-HS", "head@kano-hs.dev")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/v1/schools", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_member_cannot_read_other_school(pool: PgPool) {
    let own = create_school(&pool).await;
    let other = create_school(&pool).await;
    let teacher = create_user(&pool, "teacher", Some(own)).await;
    let app = setup_test_app(pool);
    let token = login(&app, &teacher.email).await;

    let (status, _) = send(&app, "GET", &format!("/api/v1/schools/{}", own), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        send(&app, "GET", &format!("/api/v1/schools/{}", other), Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_school_is_soft(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &root.email).await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/schools/{}", school_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let is_active: bool = sqlx::query_scalar("SELECT is_active FROM schools WHERE id = $1")
        .bind(school_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!is_active);
}
