pub mod admin;
pub mod auth;
pub mod course_modules;
pub mod courses;
pub mod enrollments;
pub mod lessons;
pub mod licenses;
pub mod purchases;
pub mod reviews;
pub mod schools;
pub mod users;

pub use self::auth::model::LoginRequest;
pub use self::users::model::User;
