pub use supernova_models::enrollments::*;
