pub mod types;
pub mod settings;
pub mod error;
pub mod events;
pub mod emit;
pub mod diagnostics;

// Re-export AppError for convenience
pub use error::{AppError, AppResult};
