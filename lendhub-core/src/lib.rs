//! LendHub Core - Shared infrastructure for the LendHub client
//!
//! Errors, configuration, logging and the storage/notification seams used by
//! the application layer.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use storage::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
