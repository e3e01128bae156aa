pub use supernova_models::reviews::*;
