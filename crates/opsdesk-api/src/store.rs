//! In-memory record stores shared by handlers and the command service

use dashmap::DashMap;
use opsdesk_core::types::{
    ActivityLog, CalendarEvent, DailyMetric, Email, EmailTemplate, FeatureFlag, FunnelStep,
    Integration, Payment, Subscription, User,
};
use opsdesk_protocol::sort_newest_first;
use serde::{Deserialize, Serialize};

/// Keyed record maps. Every record lives in exactly one map, keyed by id
/// (flags by key). The analytics series is fixed at construction.
#[derive(Debug, Default)]
pub struct Stores {
    /// Dashboard users
    pub users: DashMap<String, User>,
    /// Audit trail
    pub activity: DashMap<String, ActivityLog>,
    /// Charges
    pub payments: DashMap<String, Payment>,
    /// Recurring plans
    pub subscriptions: DashMap<String, Subscription>,
    /// Calendar entries
    pub events: DashMap<String, CalendarEvent>,
    /// Mailbox
    pub emails: DashMap<String, Email>,
    /// Message templates
    pub templates: DashMap<String, EmailTemplate>,
    /// Feature toggles keyed by flag key
    pub flags: DashMap<String, FeatureFlag>,
    /// Stored third-party credentials
    pub integrations: DashMap<String, Integration>,
    /// Daily analytics samples, oldest first
    pub metrics: Vec<DailyMetric>,
    /// Conversion funnel, first step first
    pub funnel: Vec<FunnelStep>,
}

/// Record counts reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    /// Users
    pub users: usize,
    /// Activity logs
    pub activity_logs: usize,
    /// Payments
    pub payments: usize,
    /// Subscriptions
    pub subscriptions: usize,
    /// Calendar events
    pub events: usize,
    /// Emails
    pub emails: usize,
    /// Integrations
    pub integrations: usize,
}

fn values<V: Clone>(map: &DashMap<String, V>) -> Vec<V> {
    map.iter().map(|entry| entry.value().clone()).collect()
}

impl Stores {
    /// Append an activity log
    pub fn record_activity(&self, log: ActivityLog) {
        self.activity.insert(log.id.clone(), log);
    }

    /// All activity logs, newest first
    #[must_use]
    pub fn activity_logs(&self) -> Vec<ActivityLog> {
        let mut logs = values(&self.activity);
        sort_newest_first(&mut logs);
        logs
    }

    /// All calendar events, earliest start first
    #[must_use]
    pub fn calendar_events(&self) -> Vec<CalendarEvent> {
        let mut events = values(&self.events);
        events.sort_by_key(|e| e.start);
        events
    }

    /// All emails, newest first
    #[must_use]
    pub fn mailbox(&self) -> Vec<Email> {
        let mut emails = values(&self.emails);
        emails.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        emails
    }

    /// All payments, newest first
    #[must_use]
    pub fn payment_history(&self) -> Vec<Payment> {
        let mut payments = values(&self.payments);
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payments
    }

    /// All subscriptions
    #[must_use]
    pub fn subscription_list(&self) -> Vec<Subscription> {
        let mut subscriptions = values(&self.subscriptions);
        subscriptions.sort_by(|a, b| a.id.cmp(&b.id));
        subscriptions
    }

    /// Current record counts
    #[must_use]
    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            users: self.users.len(),
            activity_logs: self.activity.len(),
            payments: self.payments.len(),
            subscriptions: self.subscriptions.len(),
            events: self.events.len(),
            emails: self.emails.len(),
            integrations: self.integrations.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use opsdesk_core::types::{LogCategory, LogStatus, Severity};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn log(id: &str, hours_ago: i64) -> ActivityLog {
        ActivityLog {
            id: id.to_string(),
            user_id: "u-1".to_string(),
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            action: "login".to_string(),
            category: LogCategory::Authentication,
            severity: Severity::Low,
            status: LogStatus::Success,
            description: String::new(),
            details: BTreeMap::new(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            location: None,
            device: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
                - TimeDelta::hours(hours_ago),
        }
    }

    #[test]
    fn test_activity_logs_are_newest_first() {
        let stores = Stores::default();
        stores.record_activity(log("b", 2));
        stores.record_activity(log("a", 5));
        stores.record_activity(log("c", 0));

        let ids: Vec<_> = stores.activity_logs().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(stores.counts().activity_logs, 3);
    }

    #[test]
    fn test_empty_counts() {
        let counts = Stores::default().counts();
        assert_eq!(counts.users, 0);
        assert_eq!(counts.integrations, 0);
    }
}
