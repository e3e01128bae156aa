//! School seeding.

use fake::Fake;
use fake::faker::address::en::{CityName, StreetName};
use fake::faker::phone_number::en::PhoneNumber;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;
use uuid::Uuid;

use supernova_models::SubscriptionStatus;

use super::models::{SEED_CODE_PREFIX, SEED_EMAIL_DOMAIN, SchoolSeed, UsersPerSchool};
use super::BATCH_SIZE;
use crate::CliResult;

const TIMEZONES: [&str; 5] = [
    "Africa/Lagos",
    "Europe/London",
    "America/New_York",
    "Asia/Singapore",
    "Australia/Sydney",
];

/// Generates school rows in parallel. Capacity is sized to fit the seeded
/// members with room to spare.
pub fn generate_schools(count: usize, users: &UsersPerSchool) -> Vec<SchoolSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let tag = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
            let slug = tag.to_lowercase();

            SchoolSeed {
                name: format!("{} Academy {}", city, i + 1),
                code: format!("{}{}", SEED_CODE_PREFIX, tag),
                domain: format!("{}.{}", slug, SEED_EMAIL_DOMAIN),
                contact_email: format!("office-{}@{}", slug, SEED_EMAIL_DOMAIN),
                timezone: TIMEZONES[i % TIMEZONES.len()].to_string(),
                address: format!("{} {}, {}", (1..999).fake::<u16>(), street, city),
                max_students: (users.students * 2).max(10) as i32,
                max_teachers: (users.teachers * 2).max(5) as i32,
            }
        })
        .collect()
}

pub async fn seed_schools(
    db: &PgPool,
    count: usize,
    users: &UsersPerSchool,
) -> CliResult<Vec<Uuid>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} schools...", count);

    let schools = generate_schools(count, users);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(schools.len());
    for chunk in schools.chunks(BATCH_SIZE) {
        ids.extend(insert_schools_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} schools in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_schools_chunk(
    tx: &mut Transaction<'_, Postgres>,
    schools: &[SchoolSeed],
) -> CliResult<Vec<Uuid>> {
    if schools.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO schools (name, code, domain, contact_email, contact_phone, timezone, \
         address, subscription_status, max_students, max_teachers) ",
    );
    query.push_values(schools, |mut row, school| {
        let phone: String = PhoneNumber().fake();
        row.push_bind(&school.name)
            .push_bind(&school.code)
            .push_bind(&school.domain)
            .push_bind(&school.contact_email)
            .push_bind(phone)
            .push_bind(&school.timezone)
            .push_bind(&school.address)
            .push_bind(SubscriptionStatus::Active)
            .push_bind(school.max_students)
            .push_bind(school.max_teachers);
    });
    query.push(" RETURNING id");

    let ids = query.build_query_scalar().fetch_all(&mut **tx).await?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use supernova_models::validators::{validate_school_code, validate_timezone};

    #[test]
    fn generated_schools_carry_seed_markers() {
        let schools = generate_schools(8, &UsersPerSchool::default());
        assert_eq!(schools.len(), 8);
        for school in &schools {
            assert!(school.code.starts_with(SEED_CODE_PREFIX));
            assert!(school.contact_email.ends_with(SEED_EMAIL_DOMAIN));
            assert!(validate_school_code(&school.code).is_ok());
            assert!(validate_timezone(&school.timezone).is_ok());
            assert!(school.max_students >= 40);
        }
    }
}
