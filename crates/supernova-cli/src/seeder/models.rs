//! Seed rows and seeding configuration.

use supernova_models::{ContentType, DifficultyLevel, UserRole};
use uuid::Uuid;

/// Email domain of every seeded account.
pub const SEED_EMAIL_DOMAIN: &str = "seed.supernova.dev";
/// Code prefix of every seeded school and course.
pub const SEED_CODE_PREFIX: &str = "SEED-";
/// Password of every seeded account.
pub const SEED_PASSWORD: &str = "password123";

pub struct SchoolSeed {
    pub name: String,
    pub code: String,
    pub domain: String,
    pub contact_email: String,
    pub timezone: String,
    pub address: String,
    pub max_students: i32,
    pub max_teachers: i32,
}

pub struct UserSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub school_id: Option<Uuid>,
}

pub struct CourseSeed {
    pub title: String,
    pub description: String,
    pub code: String,
    pub difficulty_level: DifficultyLevel,
    pub tags: Vec<String>,
    pub is_d2c_enabled: bool,
    pub base_price: Option<f64>,
    pub currency: Option<String>,
}

pub struct ModuleSeed {
    pub title: String,
    pub description: String,
    pub sequence_number: i32,
}

pub struct LessonSeed {
    pub title: String,
    pub sequence_number: i32,
    pub content_type: ContentType,
    pub duration_minutes: i32,
}

#[derive(Clone)]
pub struct UsersPerSchool {
    pub teachers: usize,
    pub students: usize,
}

impl Default for UsersPerSchool {
    fn default() -> Self {
        Self {
            teachers: 3,
            students: 20,
        }
    }
}

#[derive(Clone)]
pub struct CourseShape {
    pub count: usize,
    pub modules_per_course: usize,
    pub lessons_per_module: usize,
}

impl Default for CourseShape {
    fn default() -> Self {
        Self {
            count: 10,
            modules_per_course: 3,
            lessons_per_module: 4,
        }
    }
}

#[derive(Clone, Default)]
pub struct SeedConfig {
    pub num_schools: usize,
    pub users_per_school: UsersPerSchool,
    pub courses: CourseShape,
    pub individual_users: usize,
}

impl SeedConfig {
    pub fn new(num_schools: usize) -> Self {
        Self {
            num_schools,
            individual_users: 10,
            ..Default::default()
        }
    }

    pub fn with_users(mut self, users: UsersPerSchool) -> Self {
        self.users_per_school = users;
        self
    }

    pub fn with_courses(mut self, courses: CourseShape) -> Self {
        self.courses = courses;
        self
    }

    pub fn with_individual_users(mut self, count: usize) -> Self {
        self.individual_users = count;
        self
    }

    /// One admin plus teachers and students.
    pub fn users_per_school(&self) -> usize {
        1 + self.users_per_school.teachers + self.users_per_school.students
    }
}
