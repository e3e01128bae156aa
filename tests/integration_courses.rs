mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;

use common::{
    create_course, create_school, create_user, grant_license, login, send, setup_test_app,
};

fn version_payload(label: &str) -> Value {
    json!({
        "version": label,
        "changelog": { "notes": "initial release" },
        "content": {
            "start_date": "2026-01-05T00:00:00Z",
            "end_date": "2026-04-05T00:00:00Z",
            "duration_weeks": 12
        }
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_lifecycle(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let app = setup_test_app(pool);
    let token = login(&app, &root.email).await;

    let (status, course) = send(
        &app,
        "POST",
        "/api/v1/courses",
        Some(&token),
        Some(json!({ "title": "Algebra I", "code": "math-101" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    assert_eq!(course["status"], "draft");
    assert_eq!(course["code"], "MATH-101");
    let course_id = course["id"].as_str().unwrap().to_string();

    // Publishing needs a description and a current version
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/courses/{}", course_id),
        Some(&token),
        Some(json!({ "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Cannot publish course, missing: description, current version"
    );

    let (status, version) = send(
        &app,
        "POST",
        &format!("/api/v1/courses/{}/versions", course_id),
        Some(&token),
        Some(version_payload("1.0")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{version}");
    assert_eq!(version["version"], "1.0");
    assert!(version["valid_until"].is_null());

    let (status, published) = send(
        &app,
        "PUT",
        &format!("/api/v1/courses/{}", course_id),
        Some(&token),
        Some(json!({ "status": "published", "description": "Linear equations and more" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{published}");
    assert_eq!(published["status"], "published");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/courses/{}", course_id),
        Some(&token),
        Some(json!({ "status": "draft" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid status transition from published to draft");

    let (status, archived) = send(
        &app,
        "PUT",
        &format!("/api/v1/courses/{}", course_id),
        Some(&token),
        Some(json!({ "status": "archived" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["status"], "archived");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_course_code_conflicts(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let app = setup_test_app(pool);
    let token = login(&app, &root.email).await;

    let payload = json!({ "title": "Physics", "code": "PHY-100" });
    let (status, _) = send(&app, "POST", "/api/v1/courses", Some(&token), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/v1/courses", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Course code already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_new_version_closes_previous(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let course = create_course(&pool, root.id, true, false, None, 1).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &root.email).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/courses/{}/versions", course.id),
        Some(&token),
        Some(version_payload("2.0")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let open: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM course_versions WHERE course_id = $1 AND valid_until IS NULL",
    )
    .bind(course.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(open, 1);

    let (status, versions) = send(
        &app,
        "GET",
        &format!("/api/v1/courses/{}/versions", course.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let versions = versions.as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], "2.0");

    // Labels are unique per course
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/courses/{}/versions", course.id),
        Some(&token),
        Some(version_payload("2.0")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_school_users_need_a_license(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let student = create_user(&pool, "student", Some(school_id)).await;
    let course = create_course(&pool, root.id, true, false, None, 2).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &student.email).await;

    let uri = format!("/api/v1/courses/{}", course.id);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You don't have access to this course");

    grant_license(&pool, course.id, school_id, root.id, None).await;

    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["current_version"]["version"], "1.0");
    let modules = body["content"]["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["lessons"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_individual_users_see_published_d2c_courses(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let learner = create_user(&pool, "individual_user", None).await;
    let d2c = create_course(&pool, root.id, false, true, Some(49.0), 1).await;
    create_course(&pool, root.id, true, false, None, 1).await;
    let app = setup_test_app(pool);
    let token = login(&app, &learner.email).await;

    let (status, body) = send(&app, "GET", "/api/v1/courses", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let courses = body["data"].as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["id"], d2c.id.to_string());
    assert_eq!(body["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleted_course_disappears(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let course = create_course(&pool, root.id, true, true, Some(10.0), 1).await;
    let app = setup_test_app(pool);
    let token = login(&app, &root.email).await;

    let uri = format!("/api/v1/courses/{}", course.id);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_super_admin_authors_courses(pool: PgPool) {
    let school_id = create_school(&pool).await;
    let admin = create_user(&pool, "school_admin", Some(school_id)).await;
    let app = setup_test_app(pool);
    let token = login(&app, &admin.email).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/courses",
        Some(&token),
        Some(json!({ "title": "Chemistry", "code": "CHE-100" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_modules_and_lessons(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let course = create_course(&pool, root.id, true, false, None, 0).await;
    let app = setup_test_app(pool);
    let token = login(&app, &root.email).await;

    // Appended after the fixture's module
    let (status, second) = send(
        &app,
        "POST",
        &format!("/api/v1/courses/content/{}/modules", course.content_id),
        Some(&token),
        Some(json!({ "title": "Advanced" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{second}");
    assert_eq!(second["sequence_number"], 2);
    let second_id = second["id"].as_str().unwrap().to_string();

    let (status, lesson) = send(
        &app,
        "POST",
        &format!("/api/v1/courses/modules/{}/lessons", second_id),
        Some(&token),
        Some(json!({ "title": "Intro video", "content_type": "video" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{lesson}");
    assert_eq!(lesson["sequence_number"], 1);
    assert_eq!(lesson["content"], json!({}));

    let (status, reordered) = send(
        &app,
        "PUT",
        "/api/v1/modules/reorder",
        Some(&token),
        Some(json!({
            "content_id": course.content_id,
            "module_ids": [second_id, course.module_id]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{reordered}");
    let reordered = reordered.as_array().unwrap();
    assert_eq!(reordered[0]["id"], second_id);
    assert_eq!(reordered[0]["sequence_number"], 1);
    assert_eq!(reordered[1]["sequence_number"], 2);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/modules/reorder",
        Some(&token),
        Some(json!({ "content_id": course.content_id, "module_ids": [second_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Module ids must match exactly the modules of the content"
    );

    let (status, lessons) = send(
        &app,
        "GET",
        &format!("/api/v1/lessons?module_id={}", second_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lessons["meta"]["total"], 1);

    // Deleting a module removes its lessons
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/modules/{}", second_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/lessons/{}", lesson["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
