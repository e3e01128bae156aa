//! User seeding: school staff, students and individual learners.

use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;
use uuid::Uuid;

use supernova_models::UserRole;

use super::BATCH_SIZE;
use super::models::{SEED_EMAIL_DOMAIN, UserSeed, UsersPerSchool};
use crate::CliResult;

/// Generates one admin plus the configured teachers and students for every
/// school.
pub fn generate_school_users(school_ids: &[Uuid], per_school: &UsersPerSchool) -> Vec<UserSeed> {
    school_ids
        .par_iter()
        .flat_map(|&school_id| {
            let mut users = Vec::with_capacity(1 + per_school.teachers + per_school.students);
            users.push(generate_user(UserRole::SchoolAdmin, Some(school_id)));
            for _ in 0..per_school.teachers {
                users.push(generate_user(UserRole::Teacher, Some(school_id)));
            }
            for _ in 0..per_school.students {
                users.push(generate_user(UserRole::Student, Some(school_id)));
            }
            users
        })
        .collect()
}

pub fn generate_individual_users(count: usize) -> Vec<UserSeed> {
    (0..count)
        .into_par_iter()
        .map(|_| generate_user(UserRole::IndividualUser, None))
        .collect()
}

fn generate_user(role: UserRole, school_id: Option<Uuid>) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let tag = &Uuid::new_v4().simple().to_string()[..10];

    let email = format!(
        "{}.{}+{}-{}@{}",
        slug(&first_name),
        slug(&last_name),
        role.as_str().replace('_', "-"),
        tag,
        SEED_EMAIL_DOMAIN
    );

    UserSeed {
        first_name,
        last_name,
        email,
        role,
        school_id,
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

pub async fn seed_users(
    db: &PgPool,
    users: &[UserSeed],
    password_hash: &str,
    label: &str,
) -> CliResult<Vec<(Uuid, UserRole, Option<Uuid>)>> {
    let start_time = Instant::now();
    println!("👥 Seeding {} {}...", users.len(), label);

    let mut tx = db.begin().await?;
    let mut inserted = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        inserted.extend(insert_users_chunk(&mut tx, chunk, password_hash).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} {} in {:?}",
        inserted.len(),
        label,
        start_time.elapsed()
    );
    Ok(inserted)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
    password_hash: &str,
) -> CliResult<Vec<(Uuid, UserRole, Option<Uuid>)>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO users (email, password, first_name, last_name, role, school_id) ",
    );
    query.push_values(users, |mut row, user| {
        row.push_bind(&user.email)
            .push_bind(password_hash)
            .push_bind(&user.first_name)
            .push_bind(&user.last_name)
            .push_bind(user.role)
            .push_bind(user.school_id);
    });
    query.push(" RETURNING id, role, school_id");

    let rows = query
        .build_query_as::<(Uuid, UserRole, Option<Uuid>)>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}

/// Returns the id of the seed super admin, creating it on first use. Seeded
/// courses and licenses are attributed to this account.
pub async fn ensure_seed_admin(db: &PgPool, password_hash: &str) -> CliResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, password, first_name, last_name, role, school_id)
         VALUES ($1, $2, 'Seed', 'Admin', $3, NULL)
         ON CONFLICT (email) DO UPDATE SET updated_at = NOW()
         RETURNING id",
    )
    .bind(format!("admin@{}", SEED_EMAIL_DOMAIN))
    .bind(password_hash)
    .bind(UserRole::SuperAdmin)
    .fetch_one(db)
    .await?;

    Ok(id)
}
