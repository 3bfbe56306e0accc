//! Health check endpoint for monitoring

use crate::state::AppState;
use crate::store::StoreCounts;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Timestamp of the check
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Seconds since the server state was built
    pub uptime_seconds: u64,
    /// Records currently held
    pub stores: StoreCounts,
}

/// Liveness check with uptime and store sizes
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2024-03-15T14:25:30Z",
///   "uptimeSeconds": 3600,
///   "stores": {"users": 5, "activityLogs": 12, "payments": 6,
///              "subscriptions": 5, "events": 4, "emails": 7, "integrations": 0}
/// }
/// ```
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        uptime_seconds: state.uptime().as_secs(),
        stores: state.stores.counts(),
    };

    debug!(uptime = response.uptime_seconds, "Health check");
    Json(response)
}
