//! API route definitions and middleware stack

use crate::{handlers, middleware, state::AppState};
use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode},
    response::Json,
    routing::{get, post},
};
use opsdesk_core::config::ApiConfig;
use opsdesk_core::types::ErrorResponse;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Dashboard API routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Activity logs
        .route(
            "/api/activity-logs",
            get(handlers::activity::list_activity_logs),
        )
        .route(
            "/api/activity-logs/export",
            get(handlers::activity::export_activity_logs),
        )
        .route(
            "/api/activity-logs/:id",
            get(handlers::activity::get_activity_log),
        )
        // Analytics and calendar
        .route("/api/analytics/kpis", get(handlers::analytics::get_kpis))
        .route(
            "/api/calendar/:year/:month",
            get(handlers::calendar::get_month),
        )
        // Mail
        .route("/api/emails", get(handlers::mail::list_emails))
        .route(
            "/api/email-templates/:id/draft",
            get(handlers::mail::template_draft),
        )
        // Billing
        .route(
            "/api/billing/summary",
            get(handlers::billing::billing_summary),
        )
        .route(
            "/api/stripe/create-checkout-session",
            post(handlers::billing::create_checkout_session),
        )
        .route(
            "/api/stripe/billing-portal",
            post(handlers::billing::billing_portal),
        )
        // State changes
        .route(
            "/api/admin/commands",
            post(handlers::commands::execute_command),
        )
        .route(
            "/api/integrations",
            post(handlers::integrations::create_integration),
        )
        .layer(CompressionLayer::new())
}

/// Build health check routes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Combine all routes into a single router
pub fn build_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(api_routes())
        .merge(health_routes())
        .fallback(not_found_handler)
}

/// CORS layer for the configured origins, `None` when CORS is off
pub fn cors_layer(config: &ApiConfig) -> Option<CorsLayer> {
    if !config.enable_cors {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    Some(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Wrap a finished router in the request-level middleware
pub fn with_middleware(router: Router, config: &ApiConfig) -> Router {
    let mut router = router
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(config) {
        router = router.layer(cors);
    }
    router
}

/// Handle 404 Not Found errors
async fn not_found_handler() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "The requested resource was not found",
            "NOT_FOUND",
        )),
    )
}
