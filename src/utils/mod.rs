//! Shared helpers for the API layer.
//!
//! - [`auth_helpers`]: caller school resolution and input normalization
//! - [`email`]: SMTP delivery of transactional email

pub mod auth_helpers;
pub mod email;
