//! Third-party integration endpoint

use crate::extractors::ValidatedJson;
use crate::handlers::{ApiResult, internal_error};
use crate::service::{AdminCommand, CommandOutcome, NewIntegration};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use opsdesk_core::types::Integration;
use std::sync::Arc;

/// Store integration credentials; the response never echoes the tokens
pub async fn create_integration(
    State(state): State<Arc<AppState>>,
    ValidatedJson(integration): ValidatedJson<NewIntegration>,
) -> ApiResult<(StatusCode, Json<Integration>)> {
    match state
        .service
        .execute(AdminCommand::CreateIntegration { integration })
        .await?
    {
        CommandOutcome::IntegrationCreated { integration } => {
            Ok((StatusCode::CREATED, Json(integration)))
        }
        _ => Err(internal_error("integration returned an unexpected outcome")),
    }
}
