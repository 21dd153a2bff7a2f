//! Slidecast Common Utilities
//!
//! Shared infrastructure for all Slidecast crates:
//! - Error types and result aliases
//! - Clock abstraction for frame pacing (real and virtual)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
