//! Shared error types

pub mod errors;

pub use errors::{BallpointError, Result};
