//! Unibot Core - shared data structures, error taxonomy and trait definitions
//!
//! Everything the pipeline crates agree on lives here: the announcement and answer types,
//! the `FetchOutcome` error classes, configuration, logging and the component seams.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
