//! # Supernova CLI
//!
//! Administrative commands and database seeding for Supernova.
//!
//! ```ignore
//! use supernova_cli::seeder::{self, SeedConfig};
//!
//! seeder::seed_all(&pool, SeedConfig::new(5)).await?;
//! ```

pub mod admin;
pub mod seeder;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;
