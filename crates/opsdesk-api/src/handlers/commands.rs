//! Admin command endpoint

use crate::extractors::JsonBody;
use crate::handlers::ApiResult;
use crate::service::{AdminCommand, CommandOutcome};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use std::sync::Arc;

/// Execute one [`AdminCommand`] posted as JSON
pub async fn execute_command(
    State(state): State<Arc<AppState>>,
    JsonBody(command): JsonBody<AdminCommand>,
) -> ApiResult<Json<CommandOutcome>> {
    Ok(Json(state.service.execute(command).await?))
}
