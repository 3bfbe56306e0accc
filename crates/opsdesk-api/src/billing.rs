//! Hosted checkout and billing portal redirects

use opsdesk_core::config::BillingConfig;
use opsdesk_core::types::{BillingCycle, PlanTier};
use opsdesk_core::utils::generate_id;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Body of `POST /api/stripe/create-checkout-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Plan being bought
    pub plan: PlanTier,
    /// Billing cycle being bought
    pub billing_cycle: BillingCycle,
    /// Customer email prefilled on the checkout page
    #[validate(email)]
    pub customer_email: String,
}

/// Body of `POST /api/stripe/billing-portal`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    /// Customer whose portal to open
    #[validate(length(min = 1, max = 128))]
    pub customer_id: String,
}

/// Where the browser should go next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectResponse {
    /// Absolute URL
    pub url: String,
}

/// Redirect construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The free tier has nothing to pay for
    #[error("The free plan does not need a checkout session")]
    FreePlan,

    /// A configured base URL is not absolute
    #[error("Invalid billing URL '{url}'")]
    InvalidUrl {
        /// Offending value
        url: String,
    },

    /// Query string encoding failed
    #[error("Could not encode redirect parameters: {0}")]
    Encode(String),
}

/// Builds redirect URLs for hosted payment pages
#[derive(Debug, Clone)]
pub struct BillingGateway {
    checkout_base_url: String,
    portal_base_url: String,
    currency: String,
}

fn absolute(url: &str) -> Result<String, BillingError> {
    let uri: http::Uri = url.parse().map_err(|_| BillingError::InvalidUrl {
        url: url.to_string(),
    })?;
    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(BillingError::InvalidUrl {
            url: url.to_string(),
        });
    }
    Ok(url.trim_end_matches('?').to_string())
}

fn with_query(base: &str, params: &[(&str, &str)]) -> Result<String, BillingError> {
    let query =
        serde_urlencoded::to_string(params).map_err(|e| BillingError::Encode(e.to_string()))?;
    let joiner = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{base}{joiner}{query}"))
}

impl BillingGateway {
    /// Create a gateway from configuration
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidUrl`] when a base URL lacks a scheme
    /// or host.
    pub fn new(config: &BillingConfig) -> Result<Self, BillingError> {
        Ok(Self {
            checkout_base_url: absolute(&config.checkout_base_url)?,
            portal_base_url: absolute(&config.portal_base_url)?,
            currency: config.default_currency.to_lowercase(),
        })
    }

    /// URL of a new checkout session
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::FreePlan`] for the free tier.
    pub fn checkout_url(&self, request: &CheckoutRequest) -> Result<String, BillingError> {
        if request.plan == PlanTier::Free {
            return Err(BillingError::FreePlan);
        }

        let session = generate_id();
        with_query(
            &self.checkout_base_url,
            &[
                ("session", session.as_str()),
                ("plan", request.plan.as_str()),
                ("cycle", request.billing_cycle.as_str()),
                ("currency", self.currency.as_str()),
                ("email", request.customer_email.as_str()),
            ],
        )
    }

    /// URL of the customer's billing portal
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Encode`] if the customer id cannot be encoded.
    pub fn portal_url(&self, request: &PortalRequest) -> Result<String, BillingError> {
        with_query(
            &self.portal_base_url,
            &[("customer", request.customer_id.as_str())],
        )
    }
}
