pub use supernova_models::admin::*;
