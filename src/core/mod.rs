// Public modules
pub mod environment;
pub mod error;
pub mod events;
pub mod executor;
pub mod layout;
pub mod messages;
pub mod plugin;
pub mod project;
pub mod release;
pub mod repository;
pub mod ssh;
pub mod task;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
