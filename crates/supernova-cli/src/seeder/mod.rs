//! Fake data for development and load testing.
//!
//! Seeded rows are recognizable by their markers: account emails end in
//! `@seed.supernova.dev` and school and course codes start with `SEED-`.
//! [`clear_all`] removes exactly those rows.
//!
//! Generation runs in parallel with rayon; inserts are multi-row statements
//! of at most [`BATCH_SIZE`] rows inside one transaction per entity.

pub mod courses;
pub mod enrollments;
pub mod models;
pub mod schools;
pub mod users;

pub use models::{CourseShape, SEED_PASSWORD, SeedConfig, UsersPerSchool};

use sqlx::PgPool;
use std::time::Instant;

use crate::CliResult;
use models::{SEED_CODE_PREFIX, SEED_EMAIL_DOMAIN};

pub const BATCH_SIZE: usize = 500;

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> CliResult<()> {
    let start_time = Instant::now();

    println!("🌱 Starting full database seeding...");
    println!("   - Schools: {}", config.num_schools);
    println!(
        "   - Users per school: 1 admin, {} teachers, {} students",
        config.users_per_school.teachers, config.users_per_school.students
    );
    println!(
        "   - Courses: {} ({} modules x {} lessons)",
        config.courses.count, config.courses.modules_per_course, config.courses.lessons_per_module
    );
    println!("   - Individual users: {}", config.individual_users);

    let password_hash = hash_password()?;
    let admin_id = users::ensure_seed_admin(db, &password_hash).await?;

    let school_ids = schools::seed_schools(db, config.num_schools, &config.users_per_school).await?;

    let school_users = users::generate_school_users(&school_ids, &config.users_per_school);
    let mut seeded_users =
        users::seed_users(db, &school_users, &password_hash, "school users").await?;
    let individuals = users::generate_individual_users(config.individual_users);
    seeded_users
        .extend(users::seed_users(db, &individuals, &password_hash, "individual users").await?);

    let course_ids = courses::seed_courses(db, &config.courses, admin_id).await?;
    courses::seed_licenses(db, &school_ids, &course_ids, admin_id).await?;
    let enrollments =
        enrollments::seed_enrollments(db, &seeded_users, &course_ids, admin_id).await?;

    println!(
        "\n✅ Seeding complete! Created {} schools, {} users, {} courses, {} enrollments in {:?}",
        school_ids.len(),
        seeded_users.len(),
        course_ids.len(),
        enrollments,
        start_time.elapsed()
    );
    println!("\n📝 Default password for all users: {}", SEED_PASSWORD);

    Ok(())
}

/// Removes every seeded row. Deletion runs children first since purchases,
/// enrollments and courses restrict deletes of the users they reference.
pub async fn clear_all(db: &PgPool) -> CliResult<()> {
    let start_time = Instant::now();
    println!("🗑️  Clearing all seeded data...");

    let email_pattern = format!("%@{}", SEED_EMAIL_DOMAIN);
    let code_pattern = format!("{}%", SEED_CODE_PREFIX);

    let mut tx = db.begin().await?;

    let purchases = sqlx::query(
        "DELETE FROM course_purchases
         WHERE user_id IN (SELECT id FROM users WHERE email LIKE $1)
            OR course_id IN (SELECT id FROM courses WHERE code LIKE $2)",
    )
    .bind(&email_pattern)
    .bind(&code_pattern)
    .execute(&mut *tx)
    .await?;

    let enrollments = sqlx::query(
        "DELETE FROM course_enrollments
         WHERE enrolled_by_id IN (SELECT id FROM users WHERE email LIKE $1)
            OR student_id IN (SELECT id FROM users WHERE email LIKE $1)
            OR individual_user_id IN (SELECT id FROM users WHERE email LIKE $1)
            OR course_id IN (SELECT id FROM courses WHERE code LIKE $2)",
    )
    .bind(&email_pattern)
    .bind(&code_pattern)
    .execute(&mut *tx)
    .await?;

    // Versions cascade with their course; their contents do not.
    let content_ids: Vec<uuid::Uuid> = sqlx::query_scalar(
        "SELECT v.content_id FROM course_versions v
         JOIN courses c ON c.id = v.course_id
         WHERE c.code LIKE $1",
    )
    .bind(&code_pattern)
    .fetch_all(&mut *tx)
    .await?;

    let courses = sqlx::query("DELETE FROM courses WHERE code LIKE $1")
        .bind(&code_pattern)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM course_contents WHERE id = ANY($1)")
        .bind(&content_ids)
        .execute(&mut *tx)
        .await?;

    let users = sqlx::query("DELETE FROM users WHERE email LIKE $1")
        .bind(&email_pattern)
        .execute(&mut *tx)
        .await?;

    let schools = sqlx::query("DELETE FROM schools WHERE code LIKE $1")
        .bind(&code_pattern)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    println!("   ✓ Deleted {} purchases", purchases.rows_affected());
    println!("   ✓ Deleted {} enrollments", enrollments.rows_affected());
    println!("   ✓ Deleted {} courses", courses.rows_affected());
    println!("   ✓ Deleted {} users", users.rows_affected());
    println!("   ✓ Deleted {} schools", schools.rows_affected());
    println!("✅ All seeded data cleared in {:?}", start_time.elapsed());
    Ok(())
}

fn hash_password() -> CliResult<String> {
    println!("🔐 Hashing password...");
    let start = Instant::now();
    // cost 4 keeps bulk seeding fast; these accounts are throwaway
    let hash = bcrypt::hash(SEED_PASSWORD, 4).map_err(|e| format!("Failed to hash password: {}", e))?;
    println!("   ✓ Hashed password in {:?}", start.elapsed());
    Ok(hash)
}
