//! HTTP routes.

pub mod admin;
pub mod api;
pub mod health;

pub use admin::{ADMIN_PATH, API_PATH, admin_handler};
pub use api::{OPERATION_ALIAS, OPERATION_PARAM, api_handler};
pub use health::health_routes;
