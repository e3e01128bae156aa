//! Course catalog seeding.
//!
//! Every course gets version `1.0` with one content tree. Ids are generated
//! up front so the whole tree can be batch inserted without read-backs.

use chrono::{Duration, Utc};
use fake::Fake;
use fake::faker::lorem::en::{Paragraph, Sentence, Words};
use rayon::prelude::*;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;
use uuid::Uuid;

use supernova_models::{ContentType, CourseStatus, DifficultyLevel};

use super::BATCH_SIZE;
use super::models::{CourseSeed, CourseShape, LessonSeed, ModuleSeed, SEED_CODE_PREFIX};
use crate::CliResult;

const SUBJECTS: [&str; 8] = [
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "Literature",
    "History",
    "Geography",
    "Computer Science",
];

const LESSON_TYPES: [ContentType; 5] = [
    ContentType::Text,
    ContentType::Video,
    ContentType::Pdf,
    ContentType::Presentation,
    ContentType::Audio,
];

/// A course with its generated ids and content tree.
pub struct CourseTree {
    pub id: Uuid,
    pub content_id: Uuid,
    pub course: CourseSeed,
    pub modules: Vec<(Uuid, ModuleSeed, Vec<LessonSeed>)>,
}

pub fn generate_courses(shape: &CourseShape) -> Vec<CourseTree> {
    (0..shape.count)
        .into_par_iter()
        .map(|i| generate_course(i, shape))
        .collect()
}

fn generate_course(index: usize, shape: &CourseShape) -> CourseTree {
    let subject = SUBJECTS[index % SUBJECTS.len()];
    let difficulty = match index % 3 {
        0 => DifficultyLevel::Beginner,
        1 => DifficultyLevel::Intermediate,
        _ => DifficultyLevel::Advanced,
    };
    // every other course is also sold directly
    let is_d2c_enabled = index % 2 == 0;
    let tags: Vec<String> = Words(2..4).fake::<Vec<String>>();
    let tag = Uuid::new_v4().simple().to_string()[..8].to_uppercase();

    let course = CourseSeed {
        title: format!("{} {}", subject, index + 1),
        description: Paragraph(2..4).fake(),
        code: format!("{}{}", SEED_CODE_PREFIX, tag),
        difficulty_level: difficulty,
        tags,
        is_d2c_enabled,
        base_price: is_d2c_enabled.then(|| (19 + (index % 5) * 10) as f64 + 0.99),
        currency: is_d2c_enabled.then(|| "USD".to_string()),
    };

    let modules = (0..shape.modules_per_course)
        .map(|m| {
            let module = ModuleSeed {
                title: format!("Unit {}: {}", m + 1, Sentence(2..5).fake::<String>()),
                description: Sentence(6..12).fake(),
                sequence_number: m as i32 + 1,
            };
            let lessons = (0..shape.lessons_per_module)
                .map(|l| LessonSeed {
                    title: Sentence(3..6).fake(),
                    sequence_number: l as i32 + 1,
                    content_type: LESSON_TYPES[(m + l) % LESSON_TYPES.len()],
                    duration_minutes: (10..60).fake(),
                })
                .collect();
            (Uuid::new_v4(), module, lessons)
        })
        .collect();

    CourseTree {
        id: Uuid::new_v4(),
        content_id: Uuid::new_v4(),
        course,
        modules,
    }
}

pub async fn seed_courses(
    db: &PgPool,
    shape: &CourseShape,
    created_by_id: Uuid,
) -> CliResult<Vec<Uuid>> {
    let start_time = Instant::now();
    println!("📚 Seeding {} courses...", shape.count);

    let trees = generate_courses(shape);
    let mut tx = db.begin().await?;
    for chunk in trees.chunks(BATCH_SIZE) {
        insert_courses_chunk(&mut tx, chunk, created_by_id).await?;
        insert_contents_chunk(&mut tx, chunk).await?;
        insert_versions_chunk(&mut tx, chunk).await?;
    }

    let modules: Vec<_> = trees
        .iter()
        .flat_map(|tree| {
            tree.modules
                .iter()
                .map(move |(id, module, _)| (tree.content_id, *id, module))
        })
        .collect();
    for chunk in modules.chunks(BATCH_SIZE) {
        insert_modules_chunk(&mut tx, chunk).await?;
    }

    let lessons: Vec<_> = trees
        .iter()
        .flat_map(|tree| tree.modules.iter())
        .flat_map(|(module_id, _, lessons)| lessons.iter().map(move |l| (*module_id, l)))
        .collect();
    for chunk in lessons.chunks(BATCH_SIZE) {
        insert_lessons_chunk(&mut tx, chunk).await?;
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} courses, {} modules, {} lessons in {:?}",
        trees.len(),
        modules.len(),
        lessons.len(),
        start_time.elapsed()
    );
    Ok(trees.into_iter().map(|tree| tree.id).collect())
}

async fn insert_courses_chunk(
    tx: &mut Transaction<'_, Postgres>,
    trees: &[CourseTree],
    created_by_id: Uuid,
) -> CliResult<()> {
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO courses (id, title, description, code, status, difficulty_level, tags, \
         is_b2b_enabled, is_d2c_enabled, base_price, currency, pricing_type, created_by_id) ",
    );
    query.push_values(trees, |mut row, tree| {
        let course = &tree.course;
        row.push_bind(tree.id)
            .push_bind(&course.title)
            .push_bind(&course.description)
            .push_bind(&course.code)
            .push_bind(CourseStatus::Published)
            .push_bind(course.difficulty_level)
            .push_bind(&course.tags)
            .push_bind(true)
            .push_bind(course.is_d2c_enabled)
            .push_bind(course.base_price)
            .push_bind(&course.currency)
            .push_bind(course.is_d2c_enabled.then_some("one-time"))
            .push_bind(created_by_id);
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_contents_chunk(
    tx: &mut Transaction<'_, Postgres>,
    trees: &[CourseTree],
) -> CliResult<()> {
    let start = Utc::now();
    let end = start + Duration::weeks(12);

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO course_contents (id, start_date, end_date, duration_weeks, content_status) ",
    );
    query.push_values(trees, |mut row, tree| {
        row.push_bind(tree.content_id)
            .push_bind(start)
            .push_bind(end)
            .push_bind(12_i32)
            .push_bind(CourseStatus::Published);
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_versions_chunk(
    tx: &mut Transaction<'_, Postgres>,
    trees: &[CourseTree],
) -> CliResult<()> {
    let mut query =
        QueryBuilder::<Postgres>::new("INSERT INTO course_versions (course_id, version, content_id, changelog) ");
    query.push_values(trees, |mut row, tree| {
        row.push_bind(tree.id)
            .push_bind("1.0")
            .push_bind(tree.content_id)
            .push_bind(json!({ "summary": "Initial release" }));
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_modules_chunk(
    tx: &mut Transaction<'_, Postgres>,
    modules: &[(Uuid, Uuid, &ModuleSeed)],
) -> CliResult<()> {
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO modules (content_id, id, title, description, sequence_number, status) ",
    );
    query.push_values(modules, |mut row, (content_id, id, module)| {
        row.push_bind(*content_id)
            .push_bind(*id)
            .push_bind(&module.title)
            .push_bind(&module.description)
            .push_bind(module.sequence_number)
            .push_bind(CourseStatus::Published);
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_lessons_chunk(
    tx: &mut Transaction<'_, Postgres>,
    lessons: &[(Uuid, &LessonSeed)],
) -> CliResult<()> {
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO lessons (module_id, title, sequence_number, content_type, content, \
         duration_minutes) ",
    );
    query.push_values(lessons, |mut row, (module_id, lesson)| {
        row.push_bind(*module_id)
            .push_bind(&lesson.title)
            .push_bind(lesson.sequence_number)
            .push_bind(lesson.content_type)
            .push_bind(json!({ "body": Paragraph(1..3).fake::<String>() }))
            .push_bind(lesson.duration_minutes);
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}

/// Grants every school a one-year license to every course.
pub async fn seed_licenses(
    db: &PgPool,
    school_ids: &[Uuid],
    course_ids: &[Uuid],
    granted_by_id: Uuid,
) -> CliResult<usize> {
    let start_time = Instant::now();
    let pairs: Vec<(Uuid, Uuid)> = school_ids
        .iter()
        .flat_map(|&school_id| course_ids.iter().map(move |&course_id| (school_id, course_id)))
        .collect();
    println!("📜 Seeding {} course licenses...", pairs.len());

    let valid_until = Utc::now() + Duration::days(365);
    let mut tx = db.begin().await?;
    for chunk in pairs.chunks(BATCH_SIZE) {
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO course_licenses (school_id, course_id, granted_by_id, valid_until) ",
        );
        query.push_values(chunk, |mut row, (school_id, course_id)| {
            row.push_bind(*school_id)
                .push_bind(*course_id)
                .push_bind(granted_by_id)
                .push_bind(valid_until);
        });
        query.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} licenses in {:?}",
        pairs.len(),
        start_time.elapsed()
    );
    Ok(pairs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trees_follow_the_requested_shape() {
        let shape = CourseShape {
            count: 4,
            modules_per_course: 2,
            lessons_per_module: 3,
        };
        let trees = generate_courses(&shape);
        assert_eq!(trees.len(), 4);
        for tree in &trees {
            assert_eq!(tree.modules.len(), 2);
            for (i, (_, module, lessons)) in tree.modules.iter().enumerate() {
                assert_eq!(module.sequence_number, i as i32 + 1);
                assert_eq!(lessons.len(), 3);
                assert_eq!(lessons[2].sequence_number, 3);
            }
        }
    }

    #[test]
    fn direct_sale_courses_are_priced() {
        let trees = generate_courses(&CourseShape::default());
        for tree in &trees {
            let course = &tree.course;
            assert!(course.code.starts_with(SEED_CODE_PREFIX));
            assert_eq!(course.is_d2c_enabled, course.base_price.is_some());
            assert_eq!(course.is_d2c_enabled, course.currency.is_some());
            if let Some(price) = course.base_price {
                assert!(price > 0.0);
            }
        }
    }
}
