//! Admin command service
//!
//! Every state change the dashboard can request goes through
//! [`AdminService::execute`]. The server holds one implementation behind an
//! `Arc<dyn AdminService>`; the HTTP client in `opsdesk-client` provides
//! another that forwards commands over the network.

use crate::store::Stores;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use opsdesk_core::types::{
    ActivityLog, CalendarEvent, Email, EmailFolder, FeatureFlag, Integration, LogCategory,
    LogStatus, Severity, Subscription, SubscriptionStatus, User, UserPatch,
};
use opsdesk_core::utils::{generate_id, validate_flag_key};
use opsdesk_protocol::{ActivityFilter, ExportError, ExportFormat, export_file, filter_logs};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

/// Credentials submitted when connecting a third-party account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewIntegration {
    /// Provider type, e.g. `google` or `slack`
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub kind: String,
    /// Display name
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// OAuth access token
    #[validate(length(min = 1))]
    pub access_token: String,
    /// OAuth refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Account email at the provider
    #[validate(email)]
    pub user_email: String,
}

/// A named operation against the admin stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AdminCommand {
    /// Apply a partial update to a user
    UpdateUser {
        /// User id
        id: String,
        /// Fields to change
        patch: UserPatch,
    },
    /// Remove a user
    DeleteUser {
        /// User id
        id: String,
    },
    /// Turn a feature flag on or off
    SetFeatureFlag {
        /// Flag key
        key: String,
        /// New value
        enabled: bool,
    },
    /// End a subscription now
    CancelSubscription {
        /// Subscription id
        id: String,
    },
    /// Encode the activity logs matching a filter
    ExportActivityLogs {
        /// Logs to include
        #[serde(default)]
        filter: ActivityFilter,
        /// Output encoding
        #[serde(default)]
        format: ExportFormat,
    },
    /// Move a message to another folder
    MoveEmail {
        /// Email id
        id: String,
        /// Destination folder
        folder: EmailFolder,
    },
    /// Move a message to trash, or drop it when already there
    DeleteEmail {
        /// Email id
        id: String,
    },
    /// Add a calendar event; a fresh id is always assigned
    CreateEvent {
        /// The event
        event: CalendarEvent,
    },
    /// Remove a calendar event
    DeleteEvent {
        /// Event id
        id: String,
    },
    /// Store third-party credentials
    CreateIntegration {
        /// Submitted credentials
        integration: NewIntegration,
    },
}

impl AdminCommand {
    /// Command name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateUser { .. } => "update_user",
            Self::DeleteUser { .. } => "delete_user",
            Self::SetFeatureFlag { .. } => "set_feature_flag",
            Self::CancelSubscription { .. } => "cancel_subscription",
            Self::ExportActivityLogs { .. } => "export_activity_logs",
            Self::MoveEmail { .. } => "move_email",
            Self::DeleteEmail { .. } => "delete_email",
            Self::CreateEvent { .. } => "create_event",
            Self::DeleteEvent { .. } => "delete_event",
            Self::CreateIntegration { .. } => "create_integration",
        }
    }
}

/// Result of a successful command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandOutcome {
    /// The user after the update
    UserUpdated {
        /// Updated user
        user: User,
    },
    /// The user is gone
    UserDeleted {
        /// Removed id
        id: String,
    },
    /// The flag after the change
    FeatureFlagSet {
        /// Updated flag
        flag: FeatureFlag,
    },
    /// The subscription after cancellation
    SubscriptionCanceled {
        /// Canceled subscription
        subscription: Subscription,
    },
    /// Encoded activity logs
    Exported {
        /// Suggested download name
        filename: String,
        /// MIME type
        content_type: String,
        /// Number of exported logs
        records: usize,
        /// Encoded file
        content: String,
    },
    /// The message after the move
    EmailMoved {
        /// Moved message
        email: Email,
    },
    /// The message went to trash or was dropped
    EmailDeleted {
        /// Message id
        id: String,
        /// Dropped rather than moved to trash
        permanent: bool,
    },
    /// The stored event
    EventCreated {
        /// Event with its assigned id
        event: CalendarEvent,
    },
    /// The event is gone
    EventDeleted {
        /// Removed id
        id: String,
    },
    /// The stored integration; tokens are never serialized
    IntegrationCreated {
        /// Stored record
        integration: Integration,
    },
}

/// Command failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No record with that id
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Record kind
        resource: String,
        /// Requested id
        id: String,
    },

    /// The command payload is invalid
    #[error("Validation failed: {message}")]
    Validation {
        /// What is wrong
        message: String,
    },

    /// Encoding an export failed
    #[error("Export failed: {message}")]
    Export {
        /// Encoder message
        message: String,
    },

    /// The service could not be reached or answered unexpectedly
    #[error("Service unavailable: {message}")]
    Unavailable {
        /// Failure description
        message: String,
    },
}

impl ServiceError {
    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Machine readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Export { .. } => "EXPORT_ERROR",
            Self::Unavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::validation(errors.to_string())
    }
}

impl From<ExportError> for ServiceError {
    fn from(err: ExportError) -> Self {
        Self::Export {
            message: err.to_string(),
        }
    }
}

/// Executes admin commands
#[async_trait]
pub trait AdminService: Send + Sync {
    /// Run `command` and report what changed
    async fn execute(&self, command: AdminCommand) -> Result<CommandOutcome, ServiceError>;
}

/// Identity recorded on audit entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// User id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
}

impl Actor {
    /// The built-in system operator
    #[must_use]
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            name: "Opsdesk".to_string(),
            email: "system@opsdesk.local".to_string(),
        }
    }
}

struct Audit {
    action: &'static str,
    category: LogCategory,
    severity: Severity,
    description: String,
    details: BTreeMap<String, Value>,
}

/// [`AdminService`] over the shared in-memory stores. Every successful
/// command appends an activity log attributed to the configured actor.
#[derive(Debug)]
pub struct InMemoryAdminService {
    stores: Arc<Stores>,
    actor: Actor,
}

impl InMemoryAdminService {
    /// Create a service acting as [`Actor::system`]
    #[must_use]
    pub fn new(stores: Arc<Stores>) -> Self {
        Self {
            stores,
            actor: Actor::system(),
        }
    }

    /// Attribute audit entries to `actor`
    #[must_use]
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    fn record(&self, audit: Audit) {
        self.stores.record_activity(ActivityLog {
            id: generate_id(),
            user_id: self.actor.user_id.clone(),
            user_name: self.actor.name.clone(),
            user_email: self.actor.email.clone(),
            action: audit.action.to_string(),
            category: audit.category,
            severity: audit.severity,
            status: LogStatus::Success,
            description: audit.description,
            details: audit.details,
            ip_address: "internal".to_string(),
            user_agent: concat!("opsdesk-api/", env!("CARGO_PKG_VERSION")).to_string(),
            location: None,
            device: None,
            timestamp: Utc::now(),
        });
    }

    fn apply(&self, command: AdminCommand) -> Result<(CommandOutcome, Audit), ServiceError> {
        match command {
            AdminCommand::UpdateUser { id, patch } => {
                patch.validate()?;
                if patch.is_empty() {
                    return Err(ServiceError::validation("patch changes nothing"));
                }
                let user = {
                    let mut entry = self
                        .stores
                        .users
                        .get_mut(&id)
                        .ok_or_else(|| ServiceError::not_found("user", &id))?;
                    patch.apply(&mut entry);
                    entry.clone()
                };
                let audit = Audit {
                    action: "user_updated",
                    category: LogCategory::Profile,
                    severity: Severity::Low,
                    description: format!("Updated user {}", user.email),
                    details: details([("userId", json!(id)), ("patch", json!(patch))]),
                };
                Ok((CommandOutcome::UserUpdated { user }, audit))
            }

            AdminCommand::DeleteUser { id } => {
                let (_, user) = self
                    .stores
                    .users
                    .remove(&id)
                    .ok_or_else(|| ServiceError::not_found("user", &id))?;
                let audit = Audit {
                    action: "user_deleted",
                    category: LogCategory::Data,
                    severity: Severity::High,
                    description: format!("Deleted user {}", user.email),
                    details: details([("userId", json!(id))]),
                };
                Ok((CommandOutcome::UserDeleted { id }, audit))
            }

            AdminCommand::SetFeatureFlag { key, enabled } => {
                if !validate_flag_key(&key) {
                    return Err(ServiceError::validation(format!(
                        "invalid feature flag key '{key}'"
                    )));
                }
                let flag = {
                    let mut entry = self
                        .stores
                        .flags
                        .get_mut(&key)
                        .ok_or_else(|| ServiceError::not_found("feature flag", &key))?;
                    entry.enabled = enabled;
                    entry.clone()
                };
                let audit = Audit {
                    action: "feature_flag_updated",
                    category: LogCategory::System,
                    severity: Severity::Medium,
                    description: format!(
                        "{} feature flag {key}",
                        if enabled { "Enabled" } else { "Disabled" }
                    ),
                    details: details([("key", json!(key)), ("enabled", json!(enabled))]),
                };
                Ok((CommandOutcome::FeatureFlagSet { flag }, audit))
            }

            AdminCommand::CancelSubscription { id } => {
                let subscription = {
                    let mut entry = self
                        .stores
                        .subscriptions
                        .get_mut(&id)
                        .ok_or_else(|| ServiceError::not_found("subscription", &id))?;
                    entry.status = SubscriptionStatus::Canceled;
                    entry.cancel_at_period_end = false;
                    entry.clone()
                };
                let audit = Audit {
                    action: "subscription_canceled",
                    category: LogCategory::Payment,
                    severity: Severity::Medium,
                    description: format!("Canceled {} subscription", subscription.plan),
                    details: details([
                        ("subscriptionId", json!(id)),
                        ("userId", json!(subscription.user_id)),
                    ]),
                };
                Ok((CommandOutcome::SubscriptionCanceled { subscription }, audit))
            }

            AdminCommand::ExportActivityLogs { filter, format } => {
                let now = Utc::now();
                let logs = self.stores.activity_logs();
                let selected = filter_logs(&logs, &filter, now);
                let file = export_file(&selected, format, now.date_naive())?;
                let content = String::from_utf8(file.bytes).map_err(|e| ServiceError::Export {
                    message: e.to_string(),
                })?;
                let audit = Audit {
                    action: "activity_logs_exported",
                    category: LogCategory::Data,
                    severity: Severity::Low,
                    description: format!("Exported {} activity logs", selected.len()),
                    details: details([
                        ("format", json!(format)),
                        ("records", json!(selected.len())),
                        ("filter", json!(filter)),
                    ]),
                };
                Ok((
                    CommandOutcome::Exported {
                        filename: file.filename,
                        content_type: file.content_type.to_string(),
                        records: selected.len(),
                        content,
                    },
                    audit,
                ))
            }

            AdminCommand::MoveEmail { id, folder } => {
                if folder == EmailFolder::Starred {
                    return Err(ServiceError::validation(
                        "starred is a view, star the message instead",
                    ));
                }
                let email = {
                    let mut entry = self
                        .stores
                        .emails
                        .get_mut(&id)
                        .ok_or_else(|| ServiceError::not_found("email", &id))?;
                    entry.folder = folder;
                    entry.clone()
                };
                let audit = Audit {
                    action: "email_moved",
                    category: LogCategory::Data,
                    severity: Severity::Low,
                    description: format!("Moved \"{}\" to {folder}", email.subject),
                    details: details([("emailId", json!(id)), ("folder", json!(folder))]),
                };
                Ok((CommandOutcome::EmailMoved { email }, audit))
            }

            AdminCommand::DeleteEmail { id } => {
                // Decide and act under one shard lock
                let in_trash = match self.stores.emails.entry(id.clone()) {
                    Entry::Occupied(entry) if entry.get().folder == EmailFolder::Trash => {
                        entry.remove();
                        true
                    }
                    Entry::Occupied(mut entry) => {
                        entry.get_mut().folder = EmailFolder::Trash;
                        false
                    }
                    Entry::Vacant(_) => return Err(ServiceError::not_found("email", &id)),
                };
                let audit = Audit {
                    action: "email_deleted",
                    category: LogCategory::Data,
                    severity: if in_trash { Severity::Medium } else { Severity::Low },
                    description: if in_trash {
                        "Permanently deleted email".to_string()
                    } else {
                        "Moved email to trash".to_string()
                    },
                    details: details([("emailId", json!(id)), ("permanent", json!(in_trash))]),
                };
                Ok((
                    CommandOutcome::EmailDeleted {
                        id,
                        permanent: in_trash,
                    },
                    audit,
                ))
            }

            AdminCommand::CreateEvent { mut event } => {
                event.validate()?;
                event.id = generate_id();
                self.stores.events.insert(event.id.clone(), event.clone());
                let audit = Audit {
                    action: "event_created",
                    category: LogCategory::Data,
                    severity: Severity::Low,
                    description: format!("Created {} \"{}\"", event.event_type, event.title),
                    details: details([("eventId", json!(event.id)), ("start", json!(event.start))]),
                };
                Ok((CommandOutcome::EventCreated { event }, audit))
            }

            AdminCommand::DeleteEvent { id } => {
                let (_, event) = self
                    .stores
                    .events
                    .remove(&id)
                    .ok_or_else(|| ServiceError::not_found("event", &id))?;
                let audit = Audit {
                    action: "event_deleted",
                    category: LogCategory::Data,
                    severity: Severity::Low,
                    description: format!("Deleted event \"{}\"", event.title),
                    details: details([("eventId", json!(id))]),
                };
                Ok((CommandOutcome::EventDeleted { id }, audit))
            }

            AdminCommand::CreateIntegration { integration } => {
                integration.validate()?;
                let NewIntegration {
                    kind,
                    name,
                    access_token,
                    refresh_token,
                    user_email,
                } = integration;
                let stored = Integration {
                    id: generate_id(),
                    kind,
                    name,
                    user_email,
                    access_token,
                    refresh_token,
                    created_at: Utc::now(),
                };
                self.stores
                    .integrations
                    .insert(stored.id.clone(), stored.clone());
                let audit = Audit {
                    action: "integration_connected",
                    category: LogCategory::Security,
                    severity: Severity::Medium,
                    description: format!("Connected {} integration \"{}\"", stored.kind, stored.name),
                    details: details([
                        ("integrationId", json!(stored.id)),
                        ("type", json!(stored.kind)),
                    ]),
                };
                Ok((
                    CommandOutcome::IntegrationCreated {
                        integration: stored,
                    },
                    audit,
                ))
            }
        }
    }
}

fn details<const N: usize>(pairs: [(&str, Value); N]) -> BTreeMap<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[async_trait]
impl AdminService for InMemoryAdminService {
    async fn execute(&self, command: AdminCommand) -> Result<CommandOutcome, ServiceError> {
        let name = command.name();
        match self.apply(command) {
            Ok((outcome, audit)) => {
                info!(command = name, action = audit.action, "Admin command executed");
                self.record(audit);
                Ok(outcome)
            }
            Err(err) => {
                warn!(command = name, error = %err, "Admin command rejected");
                Err(err)
            }
        }
    }
}
