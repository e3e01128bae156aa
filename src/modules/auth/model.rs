pub use supernova_models::auth::*;
