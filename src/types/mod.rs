//! Shared types for Pasture

pub mod error;

pub use error::{PastureError, Result};
