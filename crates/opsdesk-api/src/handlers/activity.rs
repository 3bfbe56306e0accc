//! Activity log endpoints

use crate::extractors::QueryParams;
use crate::handlers::{ApiResult, internal_error, not_found};
use crate::service::{AdminCommand, CommandOutcome};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use opsdesk_core::types::ActivityLog;
use opsdesk_protocol::{
    ActivityFilter, ActivitySummary, ExportFormat, FacetCounts, facet_counts, filter_logs,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Filtered activity logs with the figures shown above the table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogsResponse {
    /// Matching logs, newest first
    pub logs: Vec<ActivityLog>,
    /// Summary of the matching logs
    pub summary: ActivitySummary,
    /// Badge counts over all logs
    pub facets: FacetCounts,
}

/// Query string of the export endpoint: the filter plus an output format
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    /// Output encoding
    #[serde(default)]
    pub format: ExportFormat,
    /// Logs to include
    #[serde(flatten)]
    pub filter: ActivityFilter,
}

/// List activity logs matching the query-string filter
pub async fn list_activity_logs(
    State(state): State<Arc<AppState>>,
    QueryParams(filter): QueryParams<ActivityFilter>,
) -> Json<ActivityLogsResponse> {
    let logs = state.stores.activity_logs();
    let filtered = filter_logs(&logs, &filter, Utc::now());
    let summary = ActivitySummary::from_logs(&filtered);

    info!(
        total = logs.len(),
        matched = summary.total,
        unrestricted = filter.is_unrestricted(),
        "Listed activity logs"
    );

    Json(ActivityLogsResponse {
        logs: filtered.into_iter().cloned().collect(),
        summary,
        facets: facet_counts(&logs),
    })
}

/// Fetch one activity log and notify that its details were viewed
pub async fn get_activity_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActivityLog>> {
    let Some(log) = state.stores.activity.get(&id).map(|entry| entry.value().clone()) else {
        warn!("Activity log not found: {}", id);
        return Err(not_found("activity log", &id));
    };

    state.notifier.details_viewed(&log);
    Ok(Json(log))
}

/// Download the logs matching the filter as CSV or JSON
pub async fn export_activity_logs(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ExportQuery>,
) -> ApiResult<Response> {
    let outcome = state
        .service
        .execute(AdminCommand::ExportActivityLogs {
            filter: query.filter,
            format: query.format,
        })
        .await?;

    let CommandOutcome::Exported {
        filename,
        content_type,
        records,
        content,
    } = outcome
    else {
        return Err(internal_error("export returned an unexpected outcome"));
    };

    let content_type = HeaderValue::from_str(&content_type)
        .map_err(|e| internal_error(format!("invalid content type: {e}")))?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| internal_error(format!("invalid filename: {e}")))?;

    info!(records, filename = %filename, "Exported activity logs");
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}
