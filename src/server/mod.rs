//! HTTP server for Pasture

pub mod http;

pub use http::{run, AppState};
