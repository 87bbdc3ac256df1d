//! HTTP routes for Pasture

pub mod auth_routes;
pub mod health;
pub mod helpers;
pub mod herds;
pub mod notifications;
pub mod reflections;
pub mod users;

pub use auth_routes::handle_auth_request;
pub use health::{health_check, root_banner, version_info};
pub use herds::handle_herds_request;
pub use notifications::handle_notifications_request;
pub use reflections::handle_reflections_request;
pub use users::handle_users_request;
