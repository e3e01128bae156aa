//! Enrollment and purchase seeding.

use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use supernova_models::{EnrollmentType, PaymentMethod, PaymentStatus, UserRole};

use super::BATCH_SIZE;
use crate::CliResult;

/// Courses each seeded learner is enrolled in.
const COURSES_PER_LEARNER: usize = 2;

struct EnrollmentRow {
    course_id: Uuid,
    version_id: Uuid,
    learner_id: Uuid,
    enrollment_type: EnrollmentType,
}

#[derive(sqlx::FromRow)]
struct CourseOffer {
    course_id: Uuid,
    version_id: Uuid,
    is_d2c_enabled: bool,
    base_price: Option<f64>,
    currency: Option<String>,
}

/// Picks `COURSES_PER_LEARNER` offers for the learner at `index`, rotating
/// through the list so enrollments spread across courses.
fn pick<T>(offers: &[T], index: usize) -> impl Iterator<Item = &T> {
    let take = COURSES_PER_LEARNER.min(offers.len());
    (0..take).map(move |k| &offers[(index + k) % offers.len()])
}

/// Enrolls students in licensed courses and has individual learners buy and
/// enroll in direct-sale courses.
pub async fn seed_enrollments(
    db: &PgPool,
    users: &[(Uuid, UserRole, Option<Uuid>)],
    course_ids: &[Uuid],
    enrolled_by_id: Uuid,
) -> CliResult<usize> {
    let start_time = Instant::now();

    let offers = sqlx::query_as::<_, CourseOffer>(
        "SELECT c.id AS course_id, v.id AS version_id, c.is_d2c_enabled, c.base_price, c.currency
         FROM courses c
         JOIN course_versions v ON v.course_id = c.id AND v.valid_until IS NULL
         WHERE c.id = ANY($1)
         ORDER BY c.code",
    )
    .bind(course_ids)
    .fetch_all(db)
    .await?;

    if offers.is_empty() {
        return Ok(0);
    }
    let direct: Vec<&CourseOffer> = offers.iter().filter(|o| o.is_d2c_enabled).collect();
    let prices: HashMap<Uuid, (f64, String)> = direct
        .iter()
        .filter_map(|o| Some((o.course_id, (o.base_price?, o.currency.clone()?))))
        .collect();

    let mut rows = Vec::new();
    for (index, (user_id, role, _)) in users.iter().enumerate() {
        match role {
            UserRole::Student => rows.extend(pick(&offers, index).map(|o| EnrollmentRow {
                course_id: o.course_id,
                version_id: o.version_id,
                learner_id: *user_id,
                enrollment_type: EnrollmentType::B2b,
            })),
            UserRole::IndividualUser if !direct.is_empty() => {
                rows.extend(pick(&direct, index).map(|o| EnrollmentRow {
                    course_id: o.course_id,
                    version_id: o.version_id,
                    learner_id: *user_id,
                    enrollment_type: EnrollmentType::D2c,
                }))
            }
            _ => {}
        }
    }
    println!("🎓 Seeding {} enrollments...", rows.len());

    let valid_until = Utc::now() + Duration::days(365);
    let mut tx = db.begin().await?;
    for chunk in rows.chunks(BATCH_SIZE) {
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO course_enrollments (course_id, version_id, student_id, \
             individual_user_id, enrolled_by_id, enrollment_type) ",
        );
        query.push_values(chunk, |mut row, e| {
            let (student, individual) = match e.enrollment_type {
                EnrollmentType::B2b => (Some(e.learner_id), None),
                EnrollmentType::D2c => (None, Some(e.learner_id)),
            };
            let enrolled_by = match e.enrollment_type {
                EnrollmentType::B2b => enrolled_by_id,
                EnrollmentType::D2c => e.learner_id,
            };
            row.push_bind(e.course_id)
                .push_bind(e.version_id)
                .push_bind(student)
                .push_bind(individual)
                .push_bind(enrolled_by)
                .push_bind(e.enrollment_type);
        });
        query.build().execute(&mut *tx).await?;

        let purchases: Vec<_> = chunk
            .iter()
            .filter(|e| e.enrollment_type == EnrollmentType::D2c)
            .filter_map(|e| prices.get(&e.course_id).map(|p| (e, p)))
            .collect();
        if purchases.is_empty() {
            continue;
        }
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO course_purchases (course_id, user_id, amount_paid, currency, \
             payment_method, payment_status, transaction_ref, valid_until) ",
        );
        query.push_values(purchases, |mut row, (e, (amount, currency))| {
            row.push_bind(e.course_id)
                .push_bind(e.learner_id)
                .push_bind(*amount)
                .push_bind(currency.as_str())
                .push_bind(PaymentMethod::CreditCard)
                .push_bind(PaymentStatus::Completed)
                .push_bind(format!("seed-{}", Uuid::new_v4().simple()))
                .push_bind(valid_until);
        });
        query.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} enrollments in {:?}",
        rows.len(),
        start_time.elapsed()
    );
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_rotates_and_caps() {
        let offers = vec![1, 2, 3];
        assert_eq!(pick(&offers, 0).copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(pick(&offers, 2).copied().collect::<Vec<_>>(), vec![3, 1]);

        let single = vec![7];
        assert_eq!(pick(&single, 5).copied().collect::<Vec<_>>(), vec![7]);
    }
}
