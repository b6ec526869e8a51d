//! Service identity endpoints.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::store::StoreConnection;

/// Name the service reports in `/` and `/version`.
pub const SERVICE_NAME: &str = "FinDev-Backend";

/// Greeting returned by `/`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Build information returned by `/version`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub service: String,
    pub version: String,

    /// Crawler library version, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ashare_core: Option<String>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Hello, World! This is {SERVICE_NAME}."),
    })
}

pub async fn version<K, R>(State(state): State<AppState<K, R>>) -> Json<VersionResponse>
where
    K: StoreConnection,
    R: StoreConnection,
{
    Json(VersionResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ashare_core: state.config.server.ashare_core_version.clone(),
    })
}

/// Create `/` and `/version` routes.
pub fn info_routes<K, R>() -> Router<AppState<K, R>>
where
    K: StoreConnection,
    R: StoreConnection,
{
    Router::new()
        .route("/", get(root))
        .route("/version", get(version::<K, R>))
}
