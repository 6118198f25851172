// Public modules
pub mod config;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod report;
pub mod verify;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
