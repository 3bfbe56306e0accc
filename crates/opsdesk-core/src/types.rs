//! Core data types for the opsdesk dashboard
//!
//! Every record serializes camelCase on the wire. Enumerations carry a
//! lowercase wire name that is also accepted by [`std::str::FromStr`], so
//! query strings and JSON bodies share one spelling.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// User identifier type
pub type UserId = String;

/// Declares a fieldless enum with a fixed lowercase wire name per variant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            /// Every variant in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name of the variant
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(crate::Error::validation(
                        stringify!($name),
                        format!("unknown value '{other}'"),
                    )),
                }
            }
        }
    };
}

wire_enum! {
    /// Area of the product an activity belongs to
    pub enum LogCategory {
        /// Sign-in, sign-out, token refresh
        Authentication => "authentication",
        /// Profile edits
        Profile => "profile",
        /// Password, MFA and permission changes
        Security => "security",
        /// Imports, exports and deletions
        Data => "data",
        /// Billing events
        Payment => "payment",
        /// Background jobs and configuration
        System => "system",
    }
}

wire_enum! {
    /// How serious an activity is
    pub enum Severity {
        /// Routine
        Low => "low",
        /// Worth a look
        Medium => "medium",
        /// Needs attention
        High => "high",
        /// Needs attention now
        Critical => "critical",
    }
}

wire_enum! {
    /// Outcome of an activity
    pub enum LogStatus {
        /// Completed
        Success => "success",
        /// Did not complete
        Failed => "failed",
        /// Completed with caveats
        Warning => "warning",
        /// Informational only
        Info => "info",
    }
}

/// Approximate geographic origin of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Country name
    pub country: String,
    /// City name
    pub city: String,
}

/// One audited user or system action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    /// Unique identifier
    pub id: String,
    /// Acting user
    pub user_id: UserId,
    /// Display name of the acting user
    pub user_name: String,
    /// Email of the acting user
    pub user_email: String,
    /// Action name, e.g. `login` or `password_change`
    pub action: String,
    /// Product area
    pub category: LogCategory,
    /// Seriousness
    pub severity: Severity,
    /// Outcome
    pub status: LogStatus,
    /// Human readable description
    pub description: String,
    /// Free-form structured details
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    /// Source IP address
    pub ip_address: String,
    /// Source user agent
    pub user_agent: String,
    /// Approximate origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    /// Device description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// When the action happened
    pub timestamp: DateTime<Utc>,
}

wire_enum! {
    /// Subscription plan tier
    pub enum PlanTier {
        /// No charge
        Free => "free",
        /// Entry paid tier
        Starter => "starter",
        /// Team tier
        Pro => "pro",
        /// Negotiated tier
        Enterprise => "enterprise",
    }
}

wire_enum! {
    /// How often a plan is billed
    pub enum BillingCycle {
        /// Every month
        Monthly => "monthly",
        /// Every year
        Yearly => "yearly",
    }
}

wire_enum! {
    /// Payment lifecycle state
    pub enum PaymentStatus {
        /// Awaiting capture
        Pending => "pending",
        /// Captured
        Completed => "completed",
        /// Declined or errored
        Failed => "failed",
        /// Returned to the customer
        Refunded => "refunded",
    }
}

wire_enum! {
    /// Subscription lifecycle state
    pub enum SubscriptionStatus {
        /// Paid and current
        Active => "active",
        /// In a free trial
        Trialing => "trialing",
        /// Renewal payment failed
        PastDue => "past_due",
        /// Ended
        Canceled => "canceled",
    }
}

/// A single charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Unique identifier
    pub id: String,
    /// Paying user
    pub user_id: UserId,
    /// Charged amount
    pub amount: Decimal,
    /// ISO-4217 currency code
    pub currency: String,
    /// Lifecycle state
    pub status: PaymentStatus,
    /// Plan the charge is for
    pub plan: PlanTier,
    /// Billing cycle the charge is for
    pub billing_cycle: BillingCycle,
    /// When the charge was created
    pub created_at: DateTime<Utc>,
}

/// A recurring plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Unique identifier
    pub id: String,
    /// Subscribed user
    pub user_id: UserId,
    /// Plan tier
    pub plan: PlanTier,
    /// Lifecycle state
    pub status: SubscriptionStatus,
    /// Billing cycle
    pub billing_cycle: BillingCycle,
    /// Amount charged per cycle
    pub amount: Decimal,
    /// ISO-4217 currency code
    pub currency: String,
    /// Start of the current period
    pub current_period_start: DateTime<Utc>,
    /// End of the current period
    pub current_period_end: DateTime<Utc>,
    /// Whether the plan ends when the current period does
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

wire_enum! {
    /// Kind of calendar entry
    pub enum EventType {
        /// Meeting with attendees
        Meeting => "meeting",
        /// Task with a due time
        Task => "task",
        /// Reminder only
        Reminder => "reminder",
        /// Personal time
        Personal => "personal",
        /// Hard deadline
        Deadline => "deadline",
    }
}

wire_enum! {
    /// Repetition unit of a recurring event
    pub enum RecurrenceFrequency {
        /// Every day
        Daily => "daily",
        /// Every week
        Weekly => "weekly",
        /// Every month
        Monthly => "monthly",
        /// Every year
        Yearly => "yearly",
    }
}

wire_enum! {
    /// Delivery channel of a reminder
    pub enum ReminderMethod {
        /// In-app notification
        Notification => "notification",
        /// Email
        Email => "email",
    }
}

/// Recurrence descriptor. Stored with the event, never expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    /// Repetition unit
    pub frequency: RecurrenceFrequency,
    /// Units between occurrences
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Last date an occurrence may fall on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
}

const fn default_interval() -> u32 {
    1
}

/// Reminder descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Minutes before the start
    pub minutes_before: u32,
    /// Delivery channel
    pub method: ReminderMethod,
}

/// Calendar entry. Times are local wall-clock times without a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_event_window"))]
pub struct CalendarEvent {
    /// Unique identifier
    #[serde(default)]
    pub id: String,
    /// Title shown in the grid
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Start time
    pub start: NaiveDateTime,
    /// End time
    pub end: NaiveDateTime,
    /// Kind of entry
    pub event_type: EventType,
    /// Recurrence descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Reminder descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Attendee emails
    #[serde(default)]
    pub attendees: Vec<String>,
    /// Where it happens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Spans the whole day
    #[serde(default)]
    pub all_day: bool,
}

fn validate_event_window(event: &CalendarEvent) -> Result<(), ValidationError> {
    if event.end < event.start {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}

wire_enum! {
    /// Mailbox folder
    pub enum EmailFolder {
        /// Received mail
        Inbox => "inbox",
        /// Sent mail
        Sent => "sent",
        /// Unsent drafts
        Drafts => "drafts",
        /// Starred mail from any folder except trash
        Starred => "starred",
        /// Archived mail
        Archive => "archive",
        /// Junk
        Spam => "spam",
        /// Deleted mail
        Trash => "trash",
    }
}

/// Attachment metadata; contents are not stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// File name
    pub name: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// MIME type
    pub mime_type: String,
}

/// A message in the mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    /// Unique identifier
    pub id: String,
    /// Sender address
    pub from: String,
    /// Recipients
    pub to: Vec<String>,
    /// Carbon-copy recipients
    #[serde(default)]
    pub cc: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub body: String,
    /// Folder the message lives in
    pub folder: EmailFolder,
    /// User labels
    #[serde(default)]
    pub labels: Vec<String>,
    /// Attachment metadata
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Has been opened
    #[serde(default)]
    pub read: bool,
    /// Starred by the user
    #[serde(default)]
    pub starred: bool,
    /// When it arrived or was sent
    pub received_at: DateTime<Utc>,
}

/// Reusable message skeleton. `{{name}}` placeholders are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    /// Unique identifier
    pub id: String,
    /// Template name
    pub name: String,
    /// Subject line
    pub subject: String,
    /// Body text
    pub body: String,
    /// Grouping shown in the template picker
    pub category: String,
}

wire_enum! {
    /// Permission level of a dashboard user
    pub enum UserRole {
        /// Full access
        Admin => "admin",
        /// Team management
        Manager => "manager",
        /// Regular member
        Member => "member",
    }
}

wire_enum! {
    /// Account state
    pub enum UserStatus {
        /// Can sign in
        Active => "active",
        /// Has not signed in for a while
        Inactive => "inactive",
        /// Blocked by an admin
        Suspended => "suspended",
    }
}

/// Dashboard user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Permission level
    pub role: UserRole,
    /// Account state
    pub status: UserStatus,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last successful sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Partial update of a [`User`]; absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    /// New display name
    #[validate(length(min = 1, max = 120))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New email address
    #[validate(email)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New permission level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    /// New account state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserPatch {
    /// Apply the present fields to `user`
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            user.email.clone_from(email);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
    }

    /// Whether the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none() && self.status.is_none()
    }
}

/// Named boolean toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    /// Flag key
    pub key: String,
    /// What the flag controls
    pub description: String,
    /// Current value
    pub enabled: bool,
}

/// Stored third-party credential. Tokens are write-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    /// Unique identifier
    pub id: String,
    /// Provider type, e.g. `google` or `slack`
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name
    pub name: String,
    /// Account email at the provider
    pub user_email: String,
    /// OAuth access token
    #[serde(skip_serializing, default)]
    pub access_token: String,
    /// OAuth refresh token
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    /// When the credential was stored
    pub created_at: DateTime<Utc>,
}

/// One day of product analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    /// Calendar day
    pub date: NaiveDate,
    /// Distinct active users
    pub active_users: u64,
    /// New sign-ups
    pub new_users: u64,
    /// Sessions started
    pub sessions: u64,
    /// Mean session length in seconds
    pub avg_session_duration_secs: f64,
    /// Share of single-page sessions, in percent
    pub bounce_rate: f64,
    /// Revenue booked that day
    pub revenue: f64,
    /// Share of customers lost, in percent
    pub churn_rate: f64,
    /// Monthly recurring revenue at end of day
    pub mrr: f64,
}

/// One step of a conversion funnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    /// Step name
    pub name: String,
    /// Users reaching the step
    pub users: u64,
}

/// Error body returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Machine readable code
    pub code: String,
}

impl ErrorResponse {
    /// Create an error response
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}
