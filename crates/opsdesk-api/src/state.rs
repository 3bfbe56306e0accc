//! Application state management

use crate::billing::BillingGateway;
use crate::seed;
use crate::service::{AdminService, InMemoryAdminService};
use crate::store::Stores;
use chrono::Utc;
use opsdesk_core::types::ActivityLog;
use opsdesk_core::{Config, context_error, context_error::Result};
use opsdesk_protocol::DetailsNotifier;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Logs every details view through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl DetailsNotifier for TracingNotifier {
    fn details_viewed(&self, log: &ActivityLog) {
        info!(
            log_id = %log.id,
            action = %log.action,
            severity = %log.severity,
            "Activity log details viewed"
        );
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Record stores read by the query handlers
    pub stores: Arc<Stores>,
    /// Command interface for every state change
    pub service: Arc<dyn AdminService>,
    /// Checkout and portal redirects
    pub billing: BillingGateway,
    /// Called when a single activity log is opened
    pub notifier: Arc<dyn DetailsNotifier>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("stores", &self.stores.counts())
            .field("billing", &self.billing)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state backed by in-memory stores, seeded when
    /// `api.seed_sample_data` is set
    ///
    /// # Errors
    ///
    /// Returns an error if the billing configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let stores = if config.api.seed_sample_data {
            seed::sample_stores(Utc::now())
        } else {
            Stores::default()
        };
        Self::with_stores(config, Arc::new(stores))
    }

    /// Create state over existing stores
    ///
    /// # Errors
    ///
    /// Returns an error if the billing configuration is invalid.
    pub fn with_stores(config: Config, stores: Arc<Stores>) -> Result<Self> {
        let billing = BillingGateway::new(&config.billing)
            .map_err(|e| context_error!("Invalid billing configuration: {}", e))?;
        let service: Arc<dyn AdminService> =
            Arc::new(InMemoryAdminService::new(Arc::clone(&stores)));

        Ok(Self {
            config,
            stores,
            service,
            billing,
            notifier: Arc::new(TracingNotifier),
            started_at: Instant::now(),
        })
    }

    /// Replace the command service
    #[must_use]
    pub fn with_service(mut self, service: Arc<dyn AdminService>) -> Self {
        self.service = service;
        self
    }

    /// Replace the details notifier
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn DetailsNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Time since the state was created
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opsdesk_core::config::BillingConfig;

    #[test]
    fn test_new_seeds_by_default() {
        let state = AppState::new(Config::default()).unwrap();
        assert!(state.stores.counts().users > 0);
        assert!(!state.stores.metrics.is_empty());
    }

    #[test]
    fn test_debug_summarizes_stores() {
        let state = AppState::new(Config::default()).unwrap();
        let rendered = format!("{state:?}");
        assert!(rendered.starts_with("AppState {"));
        assert!(rendered.contains("activity_logs: 12"));
        assert!(rendered.ends_with(".. }"));
    }

    #[test]
    fn test_seeding_can_be_disabled() {
        let mut config = Config::default();
        config.api.seed_sample_data = false;
        let state = AppState::new(config).unwrap();
        assert_eq!(state.stores.counts().users, 0);
        assert!(state.stores.metrics.is_empty());
    }

    #[test]
    fn test_invalid_billing_url_fails() {
        let config = Config {
            billing: BillingConfig {
                portal_base_url: "not a url".to_string(),
                ..BillingConfig::default()
            },
            ..Config::default()
        };
        assert!(AppState::new(config).is_err());
    }
}
