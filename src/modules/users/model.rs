pub use supernova_models::users::*;
