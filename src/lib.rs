//! Pasture - backend for the High/Low/Buffalo reflection journal
//!
//! Users record daily High/Low/Buffalo reflections, group up into herds,
//! befriend each other, and share entries with friends or herds, who can
//! react or flag them for follow-up.
//!
//! ## Services
//!
//! - **Auth**: signup, login, JWT issue/verify, Argon2 password hashing
//! - **Visibility**: who may read, react to, or mutate a shared reflection
//! - **Feed**: reflections shared with a user across direct and herd
//!   channels, newest first, with author names attached
//! - **Reminders**: cadence-based reflection reminder checks

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PastureError, Result};
