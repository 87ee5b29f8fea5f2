//! Shared types for the foundation layer.

pub mod error;

pub use error::{ConfigError, SolverError};
