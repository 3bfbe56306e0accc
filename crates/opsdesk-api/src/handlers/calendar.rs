//! Calendar endpoint

use crate::handlers::{ApiResult, bad_request};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Local;
use opsdesk_protocol::{CalendarDay, month_grid, populate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One month of the calendar view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonthResponse {
    /// Requested year
    pub year: i32,
    /// Requested month, 1-12
    pub month: u32,
    /// 42 cells, Sunday first, with their events
    pub days: Vec<CalendarDay>,
}

/// Populated month grid; "today" is the server's local date
pub async fn get_month(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(String, String)>,
) -> ApiResult<Json<CalendarMonthResponse>> {
    let year: i32 = year
        .parse()
        .map_err(|_| bad_request(format!("Invalid year '{year}'")))?;
    let month: u32 = month
        .parse()
        .map_err(|_| bad_request(format!("Invalid month '{month}'")))?;

    let grid = month_grid(year, month, Local::now().date_naive())
        .map_err(|err| bad_request(err.to_string()))?;
    let events = state.stores.calendar_events();
    let days = populate(&grid, &events);

    debug!(year, month, events = events.len(), "Built calendar month");
    Ok(Json(CalendarMonthResponse { year, month, days }))
}
