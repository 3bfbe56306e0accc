//! Sample records for a fresh server
//!
//! Timestamps are laid out relative to the moment of seeding so that the
//! date-range filters and the current calendar month always have content.

use crate::store::Stores;
use chrono::{DateTime, Days, Local, NaiveDate, TimeDelta, Utc};
use opsdesk_core::types::{
    ActivityLog, BillingCycle, CalendarEvent, DailyMetric, Email, EmailFolder, EmailTemplate,
    EventType, FeatureFlag, FunnelStep, GeoLocation, LogCategory, LogStatus, Payment,
    PaymentStatus, PlanTier, Recurrence, RecurrenceFrequency, Reminder, ReminderMethod, Severity,
    Subscription, SubscriptionStatus, User, UserRole, UserStatus,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;

/// Days of analytics generated for a new store
pub const METRIC_DAYS: u32 = 30;

const PEOPLE: [(&str, &str, &str, UserRole, UserStatus); 5] = [
    ("u-1", "Ada Lovelace", "ada@opsdesk.dev", UserRole::Admin, UserStatus::Active),
    ("u-2", "Grace Hopper", "grace@opsdesk.dev", UserRole::Manager, UserStatus::Active),
    ("u-3", "Alan Turing", "alan@opsdesk.dev", UserRole::Member, UserStatus::Active),
    ("u-4", "Edsger Dijkstra", "edsger@opsdesk.dev", UserRole::Member, UserStatus::Inactive),
    ("u-5", "Barbara Liskov", "barbara@opsdesk.dev", UserRole::Member, UserStatus::Suspended),
];

/// Build stores populated with sample data
#[must_use]
pub fn sample_stores(now: DateTime<Utc>) -> Stores {
    let stores = Stores {
        metrics: daily_metrics(now.date_naive()),
        funnel: funnel(),
        ..Stores::default()
    };

    for user in users(now) {
        stores.users.insert(user.id.clone(), user);
    }
    for log in activity(now) {
        stores.record_activity(log);
    }
    for payment in payments(now) {
        stores.payments.insert(payment.id.clone(), payment);
    }
    for subscription in subscriptions(now) {
        stores
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }
    for event in events(Local::now().date_naive()) {
        stores.events.insert(event.id.clone(), event);
    }
    for email in emails(now) {
        stores.emails.insert(email.id.clone(), email);
    }
    for template in templates() {
        stores.templates.insert(template.id.clone(), template);
    }
    for flag in flags() {
        stores.flags.insert(flag.key.clone(), flag);
    }

    stores
}

fn users(now: DateTime<Utc>) -> Vec<User> {
    PEOPLE
        .iter()
        .zip(1i64..)
        .map(|(&(id, name, email, role, status), n)| User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            status,
            created_at: now - TimeDelta::days(400 - n * 60),
            last_login: (status == UserStatus::Active).then(|| now - TimeDelta::hours(n * 5)),
        })
        .collect()
}

struct LogSeed {
    person: usize,
    action: &'static str,
    category: LogCategory,
    severity: Severity,
    status: LogStatus,
    description: &'static str,
    hours_ago: i64,
}

const LOGS: [LogSeed; 12] = [
    LogSeed { person: 0, action: "login", category: LogCategory::Authentication, severity: Severity::Low, status: LogStatus::Success, description: "Signed in from a known device", hours_ago: 1 },
    LogSeed { person: 2, action: "login_failed", category: LogCategory::Authentication, severity: Severity::High, status: LogStatus::Failed, description: "Three failed sign-in attempts", hours_ago: 3 },
    LogSeed { person: 1, action: "profile_update", category: LogCategory::Profile, severity: Severity::Low, status: LogStatus::Success, description: "Changed display name", hours_ago: 6 },
    LogSeed { person: 0, action: "password_change", category: LogCategory::Security, severity: Severity::Medium, status: LogStatus::Success, description: "Password changed", hours_ago: 20 },
    LogSeed { person: 3, action: "data_export", category: LogCategory::Data, severity: Severity::Medium, status: LogStatus::Warning, description: "Export truncated at row limit", hours_ago: 30 },
    LogSeed { person: 1, action: "payment_succeeded", category: LogCategory::Payment, severity: Severity::Low, status: LogStatus::Success, description: "Pro plan renewed", hours_ago: 50 },
    LogSeed { person: 4, action: "payment_failed", category: LogCategory::Payment, severity: Severity::High, status: LogStatus::Failed, description: "Card declined on renewal", hours_ago: 75 },
    LogSeed { person: 0, action: "mfa_disabled", category: LogCategory::Security, severity: Severity::Critical, status: LogStatus::Warning, description: "Two-factor authentication disabled", hours_ago: 120 },
    LogSeed { person: 2, action: "backup_completed", category: LogCategory::System, severity: Severity::Low, status: LogStatus::Info, description: "Nightly backup finished", hours_ago: 200 },
    LogSeed { person: 3, action: "api_key_created", category: LogCategory::Security, severity: Severity::Medium, status: LogStatus::Success, description: "Created API key for reporting", hours_ago: 400 },
    LogSeed { person: 1, action: "bulk_delete", category: LogCategory::Data, severity: Severity::Critical, status: LogStatus::Failed, description: "Bulk delete rolled back", hours_ago: 900 },
    LogSeed { person: 4, action: "logout", category: LogCategory::Authentication, severity: Severity::Low, status: LogStatus::Success, description: "Signed out", hours_ago: 2_400 },
];

fn activity(now: DateTime<Utc>) -> Vec<ActivityLog> {
    LOGS.iter()
        .enumerate()
        .filter_map(|(i, seed)| {
            let &(user_id, user_name, user_email, ..) = PEOPLE.get(seed.person)?;
            Some(ActivityLog {
                id: format!("log-{:03}", i + 1),
                user_id: user_id.to_string(),
                user_name: user_name.to_string(),
                user_email: user_email.to_string(),
                action: seed.action.to_string(),
                category: seed.category,
                severity: seed.severity,
                status: seed.status,
                description: seed.description.to_string(),
                details: BTreeMap::from([("source".to_string(), json!("seed"))]),
                ip_address: format!("192.168.1.{}", 10 + i),
                user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
                location: Some(GeoLocation {
                    country: "United Kingdom".to_string(),
                    city: "London".to_string(),
                }),
                device: Some("Desktop".to_string()),
                timestamp: now - TimeDelta::hours(seed.hours_ago),
            })
        })
        .collect()
}

fn payments(now: DateTime<Utc>) -> Vec<Payment> {
    let rows = [
        ("pay-1", "u-2", Decimal::new(2900, 2), PaymentStatus::Completed, PlanTier::Pro, BillingCycle::Monthly, 2),
        ("pay-2", "u-3", Decimal::new(9000, 2), PaymentStatus::Completed, PlanTier::Starter, BillingCycle::Yearly, 12),
        ("pay-3", "u-5", Decimal::new(2900, 2), PaymentStatus::Failed, PlanTier::Pro, BillingCycle::Monthly, 3),
        ("pay-4", "u-1", Decimal::new(49900, 2), PaymentStatus::Completed, PlanTier::Enterprise, BillingCycle::Monthly, 20),
        ("pay-5", "u-4", Decimal::new(900, 2), PaymentStatus::Refunded, PlanTier::Starter, BillingCycle::Monthly, 40),
        ("pay-6", "u-3", Decimal::new(2900, 2), PaymentStatus::Pending, PlanTier::Pro, BillingCycle::Monthly, 0),
    ];
    rows.into_iter()
        .map(|(id, user_id, amount, status, plan, billing_cycle, days_ago)| Payment {
            id: id.to_string(),
            user_id: user_id.to_string(),
            amount,
            currency: "USD".to_string(),
            status,
            plan,
            billing_cycle,
            created_at: now - TimeDelta::days(days_ago),
        })
        .collect()
}

fn subscriptions(now: DateTime<Utc>) -> Vec<Subscription> {
    let rows = [
        ("sub-1", "u-1", PlanTier::Enterprise, SubscriptionStatus::Active, BillingCycle::Monthly, Decimal::new(49900, 2)),
        ("sub-2", "u-2", PlanTier::Pro, SubscriptionStatus::Active, BillingCycle::Monthly, Decimal::new(2900, 2)),
        ("sub-3", "u-3", PlanTier::Starter, SubscriptionStatus::Active, BillingCycle::Yearly, Decimal::new(9000, 2)),
        ("sub-4", "u-4", PlanTier::Pro, SubscriptionStatus::Trialing, BillingCycle::Monthly, Decimal::new(2900, 2)),
        ("sub-5", "u-5", PlanTier::Pro, SubscriptionStatus::PastDue, BillingCycle::Monthly, Decimal::new(2900, 2)),
    ];
    rows.into_iter()
        .map(|(id, user_id, plan, status, billing_cycle, amount)| Subscription {
            id: id.to_string(),
            user_id: user_id.to_string(),
            plan,
            status,
            billing_cycle,
            amount,
            currency: "USD".to_string(),
            current_period_start: now - TimeDelta::days(10),
            current_period_end: now + TimeDelta::days(20),
            cancel_at_period_end: false,
        })
        .collect()
}

fn events(today: NaiveDate) -> Vec<CalendarEvent> {
    let at = |day: NaiveDate, hour: u32| day.and_hms_opt(hour, 0, 0).unwrap_or_default();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let next_week = today.checked_add_days(Days::new(7)).unwrap_or(today);

    vec![
        CalendarEvent {
            id: "ev-1".to_string(),
            title: "Team standup".to_string(),
            description: "Daily sync".to_string(),
            start: at(today, 9),
            end: at(today, 9) + TimeDelta::minutes(15),
            event_type: EventType::Meeting,
            recurrence: Some(Recurrence {
                frequency: RecurrenceFrequency::Daily,
                interval: 1,
                until: None,
            }),
            reminder: Some(Reminder {
                minutes_before: 5,
                method: ReminderMethod::Notification,
            }),
            tags: vec!["team".to_string()],
            attendees: vec!["ada@opsdesk.dev".to_string(), "grace@opsdesk.dev".to_string()],
            location: Some("Room 2".to_string()),
            all_day: false,
        },
        CalendarEvent {
            id: "ev-2".to_string(),
            title: "Review billing alerts".to_string(),
            description: String::new(),
            start: at(today, 14),
            end: at(today, 15),
            event_type: EventType::Task,
            recurrence: None,
            reminder: None,
            tags: vec!["billing".to_string()],
            attendees: vec![],
            location: None,
            all_day: false,
        },
        CalendarEvent {
            id: "ev-3".to_string(),
            title: "Quarterly report due".to_string(),
            description: "Board pack".to_string(),
            start: at(tomorrow, 0),
            end: at(tomorrow, 23),
            event_type: EventType::Deadline,
            recurrence: None,
            reminder: Some(Reminder {
                minutes_before: 1_440,
                method: ReminderMethod::Email,
            }),
            tags: vec![],
            attendees: vec![],
            location: None,
            all_day: true,
        },
        CalendarEvent {
            id: "ev-4".to_string(),
            title: "Dentist".to_string(),
            description: String::new(),
            start: at(next_week, 11),
            end: at(next_week, 12),
            event_type: EventType::Personal,
            recurrence: None,
            reminder: None,
            tags: vec![],
            attendees: vec![],
            location: None,
            all_day: false,
        },
    ]
}

fn emails(now: DateTime<Utc>) -> Vec<Email> {
    let rows = [
        ("em-1", "billing@stripe.com", "Your invoice is ready", EmailFolder::Inbox, false, true, 1),
        ("em-2", "grace@opsdesk.dev", "Quarterly numbers", EmailFolder::Inbox, true, false, 5),
        ("em-3", "ada@opsdesk.dev", "Re: onboarding flow", EmailFolder::Sent, true, true, 8),
        ("em-4", "ada@opsdesk.dev", "Draft: release notes", EmailFolder::Drafts, true, false, 12),
        ("em-5", "alerts@opsdesk.dev", "Weekly uptime report", EmailFolder::Archive, true, false, 72),
        ("em-6", "winner@lottery.example", "You won!", EmailFolder::Spam, false, false, 30),
        ("em-7", "noreply@old-vendor.example", "Account closed", EmailFolder::Trash, true, true, 200),
    ];
    rows.into_iter()
        .map(|(id, from, subject, folder, read, starred, hours_ago)| Email {
            id: id.to_string(),
            from: from.to_string(),
            to: vec!["ada@opsdesk.dev".to_string()],
            cc: vec![],
            subject: subject.to_string(),
            body: format!("{subject}\n\nSee details inside the dashboard."),
            folder,
            labels: vec![],
            attachments: vec![],
            read,
            starred,
            received_at: now - TimeDelta::hours(hours_ago),
        })
        .collect()
}

fn templates() -> Vec<EmailTemplate> {
    vec![
        EmailTemplate {
            id: "tpl-welcome".to_string(),
            name: "Welcome".to_string(),
            subject: "Welcome to Opsdesk, {{name}}".to_string(),
            body: "Hi {{name}},\n\nYour {{plan}} workspace is ready.".to_string(),
            category: "onboarding".to_string(),
        },
        EmailTemplate {
            id: "tpl-payment-failed".to_string(),
            name: "Payment failed".to_string(),
            subject: "We could not charge your card".to_string(),
            body: "Hi {{name}},\n\nThe charge of {{amount}} failed. Update your card at {{portal_url}}."
                .to_string(),
            category: "billing".to_string(),
        },
        EmailTemplate {
            id: "tpl-plain".to_string(),
            name: "Plain note".to_string(),
            subject: "A quick note".to_string(),
            body: "Thanks for using Opsdesk.".to_string(),
            category: "general".to_string(),
        },
    ]
}

fn flags() -> Vec<FeatureFlag> {
    [
        ("beta.calendar", "Calendar view for all users", true),
        ("billing.portal", "Self-service billing portal", true),
        ("email.templates", "Template picker in compose", false),
        ("analytics.funnel", "Funnel chart on analytics page", true),
    ]
    .into_iter()
    .map(|(key, description, enabled)| FeatureFlag {
        key: key.to_string(),
        description: description.to_string(),
        enabled,
    })
    .collect()
}

fn daily_metrics(end: NaiveDate) -> Vec<DailyMetric> {
    (0..METRIC_DAYS)
        .filter_map(|i| {
            let date = end.checked_sub_days(Days::new(u64::from(METRIC_DAYS - 1 - i)))?;
            let wobble = f64::from((i * 7) % 11) - 5.0;
            let growth = f64::from(i);
            Some(DailyMetric {
                date,
                active_users: 1_200 + u64::from(i) * 12 + u64::from((i * 7) % 11) * 4,
                new_users: 35 + u64::from(i % 9),
                sessions: 3_100 + u64::from(i) * 25,
                avg_session_duration_secs: 240.0 + wobble * 3.0,
                bounce_rate: 42.0 - growth * 0.2 + wobble * 0.3,
                revenue: 1_450.0 + growth * 18.5 + wobble * 12.0,
                churn_rate: 2.4 - growth * 0.01,
                mrr: 48_000.0 + growth * 95.0,
            })
        })
        .collect()
}

fn funnel() -> Vec<FunnelStep> {
    [
        ("Visited site", 25_000),
        ("Signed up", 3_500),
        ("Activated", 2_800),
        ("Started trial", 2_100),
        ("Converted", 420),
    ]
    .into_iter()
    .map(|(name, users)| FunnelStep {
        name: name.to_string(),
        users,
    })
    .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opsdesk_protocol::KpiSummary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_stores_have_every_kind() {
        let stores = sample_stores(Utc::now());
        let counts = stores.counts();

        assert_eq!(counts.users, PEOPLE.len());
        assert_eq!(counts.activity_logs, LOGS.len());
        assert!(counts.payments > 0);
        assert!(counts.subscriptions > 0);
        assert!(counts.events > 0);
        assert!(counts.emails > 0);
        assert_eq!(counts.integrations, 0);
        assert_eq!(stores.metrics.len(), METRIC_DAYS as usize);
    }

    #[test]
    fn test_metrics_end_today_in_order() {
        let now = Utc::now();
        let metrics = daily_metrics(now.date_naive());
        assert_eq!(metrics.last().unwrap().date, now.date_naive());
        assert!(metrics.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_seeded_kpis_compute() {
        let stores = sample_stores(Utc::now());
        let kpis = KpiSummary::compute(&stores.metrics, &stores.funnel).unwrap();
        assert_eq!(kpis.conversion_rate, Some(1.68));
    }

    #[test]
    fn test_seeded_events_are_valid() {
        use validator::Validate;
        for event in events(Local::now().date_naive()) {
            assert!(event.validate().is_ok(), "{} should validate", event.id);
        }
    }
}
