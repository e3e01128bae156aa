mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{PASSWORD, create_user, login, send, setup_test_app, test_state};
use supernova::router::init_router;
use supernova_config::RateLimitConfig;

#[sqlx::test(migrations = "./migrations")]
async fn test_login_returns_token_pair(pool: PgPool) {
    let user = create_user(&pool, "individual_user", None).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": user.email, "password": PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["email"], user.email);
    assert!(body["user"].get("password").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_with_wrong_password(pool: PgPool) {
    let user = create_user(&pool, "individual_user", None).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "not-the-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_unknown_email_matches_wrong_password(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "nobody@test.dev", "password": PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_inactive_user_cannot_login(pool: PgPool) {
    let user = create_user(&pool, "individual_user", None).await;
    sqlx::query("UPDATE users SET is_active = FALSE, status = 'inactive' WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": user.email, "password": PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User account is not active");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_issues_new_tokens(pool: PgPool) {
    let user = create_user(&pool, "individual_user", None).await;
    let app = setup_test_app(pool);

    let (_, login_body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": user.email, "password": PASSWORD })),
    )
    .await;
    let refresh_token = login_body["refresh_token"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh_token })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert_eq!(body["user"]["id"], user.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_access_token_is_not_a_refresh_token(pool: PgPool) {
    let user = create_user(&pool, "individual_user", None).await;
    let app = setup_test_app(pool);
    let access_token = login(&app, &user.email).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": access_token })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_and_logout(pool: PgPool) {
    let user = create_user(&pool, "teacher", Some(common::create_school(&pool).await)).await;
    let app = setup_test_app(pool);
    let token = login(&app, &user.email).await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "teacher");
    assert_eq!(body["school_id"], user.school_id.unwrap().to_string());

    let (status, body) = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_protected_route_requires_token(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/v1/courses", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_health_is_public(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_auth_rate_limit_exceeded(pool: PgPool) {
    let limits = RateLimitConfig {
        general_per_second: 1,
        general_burst_size: 100,
        auth_per_second: 60,
        auth_burst_size: 2,
    };
    let app = init_router(test_state(pool, limits));
    let body = json!({ "email": "nobody@test.dev", "password": PASSWORD });

    for _ in 0..2 {
        let (status, _) = send(&app, "POST", "/api/v1/auth/login", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = send(&app, "POST", "/api/v1/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
