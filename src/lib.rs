//! # Supernova API
//!
//! A multi-tenant learning management backend built with Axum and
//! PostgreSQL. Schools license courses for their students (B2B) while
//! individual learners buy and enroll on their own (D2C).
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # AuthUser extractor and the authorization policy
//! ├── modules/          # Feature modules
//! │   ├── auth/         # Login, refresh, logout, current user
//! │   ├── users/        # User management inside tenant boundaries
//! │   ├── schools/      # Tenants and their admins
//! │   ├── courses/      # Catalog, versions and content
//! │   ├── course_modules/
//! │   ├── lessons/
//! │   ├── enrollments/  # B2B and D2C enrollments, progress
//! │   ├── purchases/    # D2C purchases
//! │   ├── licenses/     # B2B licenses (mounted under /purchases)
//! │   ├── reviews/      # Reviews, moderation and rating statistics
//! │   └── admin/        # Platform statistics and user administration
//! └── utils/            # Shared helpers
//! ```
//!
//! Each feature module has the same layout:
//!
//! - `mod.rs`: module exports
//! - `controller.rs`: HTTP handlers with their OpenAPI annotations
//! - `service.rs`: business rules and SQL
//! - `model.rs`: re-exports from `supernova-models`
//! - `router.rs`: Axum routes
//!
//! ## Roles
//!
//! | Role | Scope |
//! |------|-------|
//! | super_admin | Platform, created through the CLI or by another super admin |
//! | school_admin | One school |
//! | teacher | One school |
//! | student | One school |
//! | individual_user | Own purchases and enrollments |
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod docs;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;

// Re-export workspace crates for convenience
pub use supernova_auth;
pub use supernova_cache;
pub use supernova_config;
pub use supernova_core;
pub use supernova_db;
pub use supernova_models;
