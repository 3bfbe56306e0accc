//! Opsdesk API server library

#![forbid(unsafe_code)]

pub mod billing;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod seed;
pub mod service;
pub mod state;
pub mod store;

pub use service::{
    Actor, AdminCommand, AdminService, CommandOutcome, InMemoryAdminService, NewIntegration,
    ServiceError,
};
pub use state::AppState;
pub use store::{StoreCounts, Stores};

use axum::Router;
use opsdesk_core::Config;
use opsdesk_core::context_error::Result;
use std::sync::Arc;
use tracing::info;

/// Build the API router with all routes and middleware
///
/// # Errors
///
/// Returns an error if the application state cannot be built from
/// `config`.
pub fn build_router(config: Config) -> Result<Router> {
    let state = Arc::new(AppState::new(config)?);
    let counts = state.stores.counts();
    info!(
        users = counts.users,
        activity_logs = counts.activity_logs,
        events = counts.events,
        emails = counts.emails,
        "Application state ready"
    );
    Ok(build_router_with_state(state))
}

/// Build the router over prepared state
pub fn build_router_with_state(state: Arc<AppState>) -> Router {
    let api_config = state.config.api.clone();
    routes::with_middleware(routes::build_router().with_state(state), &api_config)
}
