//! Payment and subscription summaries

use opsdesk_core::types::{BillingCycle, Payment, PaymentStatus, Subscription, SubscriptionStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals shown on the payments page. Amounts are kept per currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    /// Completed revenue per currency
    pub completed_revenue: BTreeMap<String, Decimal>,
    /// Refunded amount per currency
    pub refunded_total: BTreeMap<String, Decimal>,
    /// Completed payments
    pub completed_count: usize,
    /// Failed payments
    pub failed_count: usize,
    /// Pending payments
    pub pending_count: usize,
}

impl PaymentSummary {
    /// Summarize a set of payments
    #[must_use]
    pub fn from_payments(payments: &[Payment]) -> Self {
        let mut summary = Self::default();

        for payment in payments {
            match payment.status {
                PaymentStatus::Completed => {
                    summary.completed_count += 1;
                    *summary
                        .completed_revenue
                        .entry(payment.currency.clone())
                        .or_default() += payment.amount;
                }
                PaymentStatus::Refunded => {
                    *summary
                        .refunded_total
                        .entry(payment.currency.clone())
                        .or_default() += payment.amount;
                }
                PaymentStatus::Failed => summary.failed_count += 1,
                PaymentStatus::Pending => summary.pending_count += 1,
            }
        }

        summary
    }
}

/// Per-month amount of a subscription, rounded to cents
#[must_use]
pub fn monthly_equivalent(subscription: &Subscription) -> Decimal {
    match subscription.billing_cycle {
        BillingCycle::Monthly => subscription.amount,
        BillingCycle::Yearly => (subscription.amount / Decimal::from(12)).round_dp(2),
    }
}

/// Monthly recurring revenue of active subscriptions, per currency
#[must_use]
pub fn mrr(subscriptions: &[Subscription]) -> BTreeMap<String, Decimal> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for subscription in subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active)
    {
        *totals.entry(subscription.currency.clone()).or_default() +=
            monthly_equivalent(subscription);
    }
    totals
}
