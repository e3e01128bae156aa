//! # Supernova Core
//!
//! Foundational types shared by every crate in the Supernova LMS workspace:
//!
//! - [`errors`]: the application error type and its HTTP mapping
//! - [`pagination`]: list query parameters and response metadata
//! - [`password`]: bcrypt hashing and verification
//! - [`serde`]: lenient deserializers for query strings
//!
//! # Example
//!
//! ```ignore
//! use supernova_core::{AppError, PaginationParams, hash_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Course not found"));
//! let hash = hash_password("correct horse battery")?;
//! let offset = PaginationParams::default().offset();
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{MIN_PASSWORD_LENGTH, hash_password, verify_password};
