use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::PgPool;

use supernova_cli::admin::{self, NewSchool};
use supernova_cli::seeder::{self, CourseShape, SeedConfig, UsersPerSchool};

#[derive(Parser)]
#[command(name = "supernova-cli")]
#[command(about = "Supernova CLI - Administrative tools for Supernova", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new super administrator account
    CreateSuperAdmin {
        /// First name of the super admin
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        /// Last name of the super admin
        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Create a school on a trial subscription
    CreateSchool {
        #[arg(long)]
        name: String,

        /// Unique school code (upper-case letters, digits, dashes)
        #[arg(long)]
        code: String,

        #[arg(long)]
        domain: String,

        #[arg(long)]
        contact_email: String,

        #[arg(long, default_value = "UTC")]
        timezone: String,

        #[arg(long, default_value = "100")]
        max_students: i32,

        #[arg(long, default_value = "10")]
        max_teachers: i32,
    },
    /// Deactivate a user account
    DeactivateUser {
        #[arg(short = 'e', long)]
        email: String,
    },
    /// Re-activate a user account
    ActivateUser {
        #[arg(short = 'e', long)]
        email: String,
    },
    /// Seed the database with fake schools, users, courses and enrollments
    Seed {
        /// Number of schools to create
        #[arg(short = 's', long, default_value = "5")]
        schools: usize,

        /// Number of teachers per school
        #[arg(long, default_value = "3")]
        teachers: usize,

        /// Number of students per school
        #[arg(long, default_value = "20")]
        students: usize,

        /// Number of courses
        #[arg(short = 'c', long, default_value = "10")]
        courses: usize,

        /// Number of modules per course
        #[arg(long, default_value = "3")]
        modules: usize,

        /// Number of lessons per module
        #[arg(long, default_value = "4")]
        lessons: usize,

        /// Number of individual (D2C) learners
        #[arg(long, default_value = "10")]
        individuals: usize,
    },
    /// Clear all seeded data (keeps real accounts)
    ClearSeed,
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();
    let pool = match supernova_db::init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to connect to database", e),
    };

    match cli.command {
        Commands::CreateSuperAdmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_super_admin(&pool, first_name, last_name, email, password).await,
        Commands::CreateSchool {
            name,
            code,
            domain,
            contact_email,
            timezone,
            max_students,
            max_teachers,
        } => {
            let school = NewSchool {
                name,
                code,
                domain,
                contact_email,
                timezone,
                max_students,
                max_teachers,
            };
            handle_create_school(&pool, school).await
        }
        Commands::DeactivateUser { email } => handle_set_active(&pool, &email, false).await,
        Commands::ActivateUser { email } => handle_set_active(&pool, &email, true).await,
        Commands::Seed {
            schools,
            teachers,
            students,
            courses,
            modules,
            lessons,
            individuals,
        } => {
            let config = SeedConfig::new(schools)
                .with_users(UsersPerSchool { teachers, students })
                .with_courses(CourseShape {
                    count: courses,
                    modules_per_course: modules,
                    lessons_per_module: lessons,
                })
                .with_individual_users(individuals);
            if let Err(e) = seeder::seed_all(&pool, config).await {
                fail("Error seeding database", e);
            }
        }
        Commands::ClearSeed => {
            if let Err(e) = seeder::clear_all(&pool).await {
                fail("Error clearing seeded data", e);
            }
        }
        Commands::Migrate => match supernova_db::run_migrations(&pool).await {
            Ok(()) => println!("✅ Migrations applied"),
            Err(e) => fail("Error running migrations", e),
        },
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}

fn prompt(value: Option<String>, label: &str) -> String {
    match value {
        Some(value) => value,
        None => Input::new()
            .with_prompt(label)
            .interact_text()
            .unwrap_or_else(|e| fail(&format!("Failed to read {}", label.to_lowercase()), e)),
    }
}

async fn handle_create_super_admin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let first_name = prompt(first_name, "First name");
    let last_name = prompt(last_name, "Last name");
    let email = prompt(email, "Email address");
    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail("Failed to read password", e))
    });

    match admin::create_super_admin(pool, &first_name, &last_name, &email, &password).await {
        Ok(id) => {
            println!("\n✅ Super admin created successfully!");
            println!("   ID: {}", id);
            println!("   Email: {}", email);
            println!("   Name: {} {}", first_name, last_name);
        }
        Err(e) => fail("Error creating super admin", e),
    }
}

async fn handle_create_school(pool: &PgPool, school: NewSchool) {
    match admin::create_school(pool, &school).await {
        Ok(id) => {
            println!("\n✅ School created successfully!");
            println!("   ID: {}", id);
            println!("   Name: {}", school.name);
            println!("   Code: {}", school.code.to_uppercase());
        }
        Err(e) => fail("Error creating school", e),
    }
}

async fn handle_set_active(pool: &PgPool, email: &str, active: bool) {
    let verb = if active { "activated" } else { "deactivated" };
    match admin::set_user_active(pool, email, active).await {
        Ok(true) => println!("✅ User {} {}", email, verb),
        Ok(false) => fail("No user found with email", email),
        Err(e) => fail("Error updating user", e),
    }
}
