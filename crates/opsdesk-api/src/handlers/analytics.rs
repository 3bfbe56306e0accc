//! Analytics endpoint

use crate::handlers::{ApiResult, api_error};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use opsdesk_protocol::{AnalyticsError, FunnelDropoff, KpiSummary, PeriodTrends, funnel_dropoffs};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Analytics page payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    /// Headline numbers
    pub kpis: KpiSummary,
    /// Week-over-week directions
    pub trends: PeriodTrends,
    /// Loss between funnel steps
    pub funnel: Vec<FunnelDropoff>,
    /// Samples the figures cover
    pub days: usize,
}

/// KPI summary, trends and funnel drop-offs over the stored series
pub async fn get_kpis(State(state): State<Arc<AppState>>) -> ApiResult<Json<AnalyticsResponse>> {
    let series = &state.stores.metrics;
    let funnel = &state.stores.funnel;

    let kpis = KpiSummary::compute(series, funnel).map_err(|err| match err {
        AnalyticsError::EmptySeries => {
            warn!("KPI request with no metrics loaded");
            api_error(StatusCode::NOT_FOUND, err.to_string(), "NO_METRICS")
        }
    })?;

    Ok(Json(AnalyticsResponse {
        kpis,
        trends: PeriodTrends::from_series(series),
        funnel: funnel_dropoffs(funnel),
        days: series.len(),
    }))
}
