pub use supernova_models::schools::*;
