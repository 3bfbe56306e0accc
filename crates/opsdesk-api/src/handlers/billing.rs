//! Billing summary and hosted payment page redirects

use crate::billing::{BillingError, CheckoutRequest, PortalRequest, RedirectResponse};
use crate::extractors::ValidatedJson;
use crate::handlers::{ApiError, ApiResult, bad_request, internal_error};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use opsdesk_core::types::SubscriptionStatus;
use opsdesk_protocol::{PaymentSummary, mrr};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Billing page payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummaryResponse {
    /// Payment totals
    pub payments: PaymentSummary,
    /// Monthly recurring revenue per currency
    pub mrr: BTreeMap<String, Decimal>,
    /// Subscriptions currently active
    pub active_subscriptions: usize,
}

fn billing_error(err: BillingError) -> ApiError {
    match err {
        BillingError::FreePlan => bad_request(err.to_string()),
        BillingError::InvalidUrl { .. } | BillingError::Encode(_) => internal_error(err.to_string()),
    }
}

/// Payment summary and MRR
pub async fn billing_summary(State(state): State<Arc<AppState>>) -> Json<BillingSummaryResponse> {
    let subscriptions = state.stores.subscription_list();
    Json(BillingSummaryResponse {
        payments: PaymentSummary::from_payments(&state.stores.payment_history()),
        mrr: mrr(&subscriptions),
        active_subscriptions: subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .count(),
    })
}

/// Start a hosted checkout session
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CheckoutRequest>,
) -> ApiResult<Json<RedirectResponse>> {
    let url = state.billing.checkout_url(&request).map_err(billing_error)?;
    info!(plan = %request.plan, cycle = %request.billing_cycle, "Created checkout session");
    Ok(Json(RedirectResponse { url }))
}

/// Open the hosted billing portal
pub async fn billing_portal(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<PortalRequest>,
) -> ApiResult<Json<RedirectResponse>> {
    let url = state.billing.portal_url(&request).map_err(billing_error)?;
    Ok(Json(RedirectResponse { url }))
}
