//! HTTP routes.

pub mod health;
pub mod info;

pub use health::health_routes;
pub use info::{RootResponse, SERVICE_NAME, VersionResponse, info_routes};
