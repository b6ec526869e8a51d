//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};

use crate::health::HealthReport;
use crate::state::AppState;
use crate::store::StoreConnection;

/// Composite health of the backing stores.
///
/// Always answers `200 OK`; degradation is reported in the body.
pub async fn health<K, R>(State(state): State<AppState<K, R>>) -> Json<HealthReport>
where
    K: StoreConnection,
    R: StoreConnection,
{
    Json(state.check_health().await)
}

/// Create health check routes.
pub fn health_routes<K, R>() -> Router<AppState<K, R>>
where
    K: StoreConnection,
    R: StoreConnection,
{
    Router::new().route("/health", get(health::<K, R>))
}
