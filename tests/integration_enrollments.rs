mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use common::{
    create_course, create_school, create_user, grant_license, login, send, setup_test_app,
};

fn progress_payload(enrollment_id: &str, lesson_id: Uuid, progress: f64) -> Value {
    json!({
        "enrollment_id": enrollment_id,
        "content_type": "lesson",
        "content_id": lesson_id,
        "progress": progress,
        "time_spent_seconds": 120
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_b2b_enrollment_needs_license(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let teacher = create_user(&pool, "teacher", Some(school_id)).await;
    let student = create_user(&pool, "student", Some(school_id)).await;
    let course = create_course(&pool, root.id, true, false, None, 1).await;
    let app = setup_test_app(pool.clone());
    let token = login(&app, &teacher.email).await;

    let payload = json!({ "course_id": course.id, "student_id": student.id });
    let (status, body) =
        send(&app, "POST", "/api/v1/enrollments/student", Some(&token), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "School does not have a license for this course");

    grant_license(&pool, course.id, school_id, root.id, None).await;

    let (status, body) =
        send(&app, "POST", "/api/v1/enrollments/student", Some(&token), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["enrollment_type"], "b2b");
    assert_eq!(body["status"], "enrolled");
    assert_eq!(body["student_id"], student.id.to_string());
    assert_eq!(body["enrolled_by_id"], teacher.id.to_string());

    let (status, body) =
        send(&app, "POST", "/api/v1/enrollments/student", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Student is already enrolled in this course");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_license_seat_limit(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let admin = create_user(&pool, "school_admin", Some(school_id)).await;
    let first = create_user(&pool, "student", Some(school_id)).await;
    let second = create_user(&pool, "student", Some(school_id)).await;
    let course = create_course(&pool, root.id, true, false, None, 1).await;
    grant_license(&pool, course.id, school_id, root.id, Some(1)).await;
    let app = setup_test_app(pool);
    let token = login(&app, &admin.email).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/enrollments/student",
        Some(&token),
        Some(json!({ "course_id": course.id, "student_id": first.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/student",
        Some(&token),
        Some(json!({ "course_id": course.id, "student_id": second.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "License seat limit reached");

    let (status, check) = send(
        &app,
        "GET",
        &format!("/api/v1/purchases/licenses/check/{}/{}", course.id, school_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["is_valid"], true);
    assert_eq!(check["seats_used"], 1);
    assert_eq!(check["max_students"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_students_cannot_enroll_others(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let student = create_user(&pool, "student", Some(school_id)).await;
    let course = create_course(&pool, root.id, true, false, None, 1).await;
    grant_license(&pool, course.id, school_id, root.id, None).await;
    let app = setup_test_app(pool);
    let token = login(&app, &student.email).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/enrollments/student",
        Some(&token),
        Some(json!({ "course_id": course.id, "student_id": student.id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_staff_cannot_enroll_student_of_other_school(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let own = create_school(&pool).await;
    let other = create_school(&pool).await;
    let teacher = create_user(&pool, "teacher", Some(own)).await;
    let outsider = create_user(&pool, "student", Some(other)).await;
    let course = create_course(&pool, root.id, true, false, None, 1).await;
    grant_license(&pool, course.id, own, root.id, None).await;
    let app = setup_test_app(pool);
    let token = login(&app, &teacher.email).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/student",
        Some(&token),
        Some(json!({ "course_id": course.id, "student_id": outsider.id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found in school");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_priced_d2c_course_requires_purchase(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let learner = create_user(&pool, "individual_user", None).await;
    let course = create_course(&pool, root.id, false, true, Some(29.99), 1).await;
    let app = setup_test_app(pool);
    let token = login(&app, &learner.email).await;

    let enroll = json!({ "course_id": course.id });
    let (status, body) =
        send(&app, "POST", "/api/v1/enrollments/individual", Some(&token), Some(enroll.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Course must be purchased before enrollment");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/purchases",
        Some(&token),
        Some(json!({
            "course_id": course.id,
            "user_id": learner.id,
            "amount_paid": 29.99,
            "currency": "usd",
            "payment_method": "credit_card",
            "payment_status": "completed"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send(&app, "POST", "/api/v1/enrollments/individual", Some(&token), Some(enroll.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["enrollment_type"], "d2c");
    assert_eq!(body["individual_user_id"], learner.id.to_string());

    let (status, body) =
        send(&app, "POST", "/api/v1/enrollments/individual", Some(&token), Some(enroll)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already enrolled in this course");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_school_course_not_open_to_individuals(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let learner = create_user(&pool, "individual_user", None).await;
    let course = create_course(&pool, root.id, true, false, None, 1).await;
    let app = setup_test_app(pool);
    let token = login(&app, &learner.email).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/individual",
        Some(&token),
        Some(json!({ "course_id": course.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Course is not available for individual enrollment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_progress_drives_enrollment_status(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let teacher = create_user(&pool, "teacher", Some(school_id)).await;
    let student = create_user(&pool, "student", Some(school_id)).await;
    let course = create_course(&pool, root.id, true, false, None, 2).await;
    grant_license(&pool, course.id, school_id, root.id, None).await;
    let app = setup_test_app(pool);

    let teacher_token = login(&app, &teacher.email).await;
    let (status, enrollment) = send(
        &app,
        "POST",
        "/api/v1/enrollments/student",
        Some(&teacher_token),
        Some(json!({ "course_id": course.id, "student_id": student.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let enrollment_id = enrollment["id"].as_str().unwrap().to_string();

    let token = login(&app, &student.email).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(progress_payload(&enrollment_id, course.lesson_ids[0], 1.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["progress"]["status"], "completed");
    assert_eq!(body["enrollment"]["status"], "in_progress");
    assert_eq!(body["enrollment"]["progress"], 0.5);

    // Time spent accumulates across updates
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(progress_payload(&enrollment_id, course.lesson_ids[0], 1.0)),
    )
    .await;
    assert_eq!(body["progress"]["time_spent_seconds"], 240);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(progress_payload(&enrollment_id, course.lesson_ids[1], 1.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enrollment"]["status"], "completed");
    assert_eq!(body["enrollment"]["progress"], 1.0);
    assert!(body["enrollment"]["completed_at"].is_string());

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/enrollments/{}/progress", enrollment_id),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_progress_rejects_foreign_content(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let learner = create_user(&pool, "individual_user", None).await;
    let course = create_course(&pool, root.id, false, true, None, 1).await;
    let unrelated = create_course(&pool, root.id, false, true, None, 1).await;
    let app = setup_test_app(pool);
    let token = login(&app, &learner.email).await;

    let (status, enrollment) = send(
        &app,
        "POST",
        "/api/v1/enrollments/individual",
        Some(&token),
        Some(json!({ "course_id": course.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{enrollment}");
    let enrollment_id = enrollment["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(progress_payload(&enrollment_id, unrelated.lesson_ids[0], 0.5)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content does not belong to this enrollment");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(progress_payload(&enrollment_id, course.lesson_ids[0], 1.5)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut oversized = progress_payload(&enrollment_id, course.lesson_ids[0], 0.5);
    oversized["time_spent_seconds"] = json!(86_401);
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(oversized),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_dropped_enrollment_rejects_progress(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let learner = create_user(&pool, "individual_user", None).await;
    let course = create_course(&pool, root.id, false, true, None, 1).await;
    let app = setup_test_app(pool);
    let token = login(&app, &learner.email).await;

    let (_, enrollment) = send(
        &app,
        "POST",
        "/api/v1/enrollments/individual",
        Some(&token),
        Some(json!({ "course_id": course.id })),
    )
    .await;
    let enrollment_id = enrollment["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/enrollments/{}/status", enrollment_id),
        Some(&token),
        Some(json!({ "status": "dropped" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "dropped");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/enrollments/progress",
        Some(&token),
        Some(progress_payload(&enrollment_id, course.lesson_ids[0], 0.3)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Cannot record progress on a dropped or suspended enrollment"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_listing_is_scoped(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let alice = create_user(&pool, "individual_user", None).await;
    let bob = create_user(&pool, "individual_user", None).await;
    let course = create_course(&pool, root.id, false, true, None, 1).await;
    let app = setup_test_app(pool);

    for learner in [&alice, &bob] {
        let token = login(&app, &learner.email).await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/enrollments/individual",
            Some(&token),
            Some(json!({ "course_id": course.id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let token = login(&app, &alice.email).await;
    let (status, body) = send(&app, "GET", "/api/v1/enrollments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["individual_user_id"], alice.id.to_string());

    let root_token = login(&app, &root.email).await;
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/v1/enrollments?course_id={}", course.id),
        Some(&root_token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["total"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_has_exactly_one_learner(pool: PgPool) {
    let root = create_user(&pool, "super_admin", None).await;
    let school_id = create_school(&pool).await;
    let student = create_user(&pool, "student", Some(school_id)).await;
    let learner = create_user(&pool, "individual_user", None).await;
    let course = create_course(&pool, root.id, true, true, None, 1).await;
    let version_id: Uuid = sqlx::query_scalar(
        "SELECT id FROM course_versions WHERE course_id = $1 AND valid_until IS NULL",
    )
    .bind(course.id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let insert = |student_id: Option<Uuid>, individual_id: Option<Uuid>, kind: &'static str| {
        sqlx::query(
            "INSERT INTO course_enrollments
                (course_id, version_id, student_id, individual_user_id, enrolled_by_id, enrollment_type)
             VALUES ($1, $2, $3, $4, $5, $6::enrollment_type)",
        )
        .bind(course.id)
        .bind(version_id)
        .bind(student_id)
        .bind(individual_id)
        .bind(root.id)
        .bind(kind)
        .execute(&pool)
    };

    for (student_id, individual_id, kind) in [
        (Some(student.id), Some(learner.id), "b2b"),
        (Some(student.id), Some(learner.id), "d2c"),
        (None, None, "b2b"),
        (None, None, "d2c"),
        (Some(student.id), None, "d2c"),
    ] {
        let err = insert(student_id, individual_id, kind).await.unwrap_err();
        let constraint = err.as_database_error().and_then(|e| e.constraint());
        assert_eq!(constraint, Some("enrollment_type_check"));
    }

    insert(Some(student.id), None, "b2b").await.unwrap();
    insert(None, Some(learner.id), "d2c").await.unwrap();
}
