// Public modules
pub mod catalog;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod services;
pub mod session;
pub mod ssh_config;
pub mod step;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use session::{CommandOutput, ExecutionSession};
