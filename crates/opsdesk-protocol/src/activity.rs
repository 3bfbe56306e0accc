//! Activity log filtering and summaries
//!
//! Filters are conjunctive: a record is kept only when every active
//! criterion admits it. Each criterion is inert at its default value, so
//! `ActivityFilter::default()` keeps every record.

use chrono::{DateTime, TimeDelta, Utc};
use opsdesk_core::types::{ActivityLog, LogCategory, LogStatus, Severity};
use opsdesk_core::utils::{contains_folded, normalize_search};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Wire spelling of [`Selection::All`]
pub const ALL_SENTINEL: &str = "all";

/// Either every value or exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection<T> {
    /// No restriction
    All,
    /// Only this value
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Selection<T> {
    /// Whether `value` passes this selection
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

impl<T> Selection<T> {
    /// Whether this selection restricts anything
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            Ok(Self::All)
        } else {
            trimmed.parse().map(Self::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_SENTINEL),
            Self::Only(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl<T: fmt::Display> Serialize for Selection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Selection<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_str(deserializer)
    }
}

/// Deserialize a string through the target's `FromStr`, so query strings
/// and JSON bodies accept exactly what `parse` accepts
pub(crate) fn parse_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// A blank value is the same as no value
fn non_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }))
}

/// Relative time window a log must fall into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    /// Any time
    #[default]
    All,
    /// Same UTC calendar day as now
    Today,
    /// The last 7 days
    Week,
    /// The last 30 days
    Month,
    /// The last 90 days
    Quarter,
}

impl DateRange {
    /// Length of the trailing window, `None` for calendar-based ranges
    #[must_use]
    pub fn window(self) -> Option<TimeDelta> {
        match self {
            Self::All | Self::Today => None,
            Self::Week => Some(TimeDelta::days(7)),
            Self::Month => Some(TimeDelta::days(30)),
            Self::Quarter => Some(TimeDelta::days(90)),
        }
    }

    /// Whether `timestamp` falls into the range as seen at `now`
    #[must_use]
    pub fn admits(self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Today => timestamp.date_naive() == now.date_naive(),
            Self::Week | Self::Month | Self::Quarter => self
                .window()
                .and_then(|window| now.checked_sub_signed(window))
                .is_none_or(|cutoff| timestamp >= cutoff),
        }
    }
}

impl FromStr for DateRange {
    type Err = opsdesk_core::Error;

    fn from_str(s: &str) -> opsdesk_core::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | ALL_SENTINEL => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            other => Err(opsdesk_core::Error::validation(
                "dateRange",
                format!("unknown value '{other}'"),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_str(deserializer)
    }
}

/// Criteria applied to activity logs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityFilter {
    /// Free text matched against user name, email, action and description
    pub search: String,
    /// Product area
    pub category: Selection<LogCategory>,
    /// Seriousness
    pub severity: Selection<Severity>,
    /// Outcome
    pub status: Selection<LogStatus>,
    /// Time window
    pub date_range: DateRange,
    /// Exact acting user; blank means any user
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "non_blank")]
    pub user_id: Option<String>,
}

impl ActivityFilter {
    /// Whether no criterion is active
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        normalize_search(&self.search).is_none()
            && self.category.is_all()
            && self.severity.is_all()
            && self.status.is_all()
            && self.date_range == DateRange::All
            && self.user_id.is_none()
    }

    /// Whether `log` satisfies every active criterion
    #[must_use]
    pub fn matches(&self, log: &ActivityLog, now: DateTime<Utc>) -> bool {
        self.matches_with(log, normalize_search(&self.search).as_deref(), now)
    }

    fn matches_with(&self, log: &ActivityLog, term: Option<&str>, now: DateTime<Utc>) -> bool {
        let text_ok = term.is_none_or(|term| {
            contains_folded(&log.user_name, term)
                || contains_folded(&log.user_email, term)
                || contains_folded(&log.action, term)
                || contains_folded(&log.description, term)
        });

        text_ok
            && self.category.admits(&log.category)
            && self.severity.admits(&log.severity)
            && self.status.admits(&log.status)
            && self.date_range.admits(log.timestamp, now)
            && self.user_id.as_ref().is_none_or(|id| *id == log.user_id)
    }
}

/// Records of `logs` that satisfy `filter`, in input order
#[must_use]
pub fn filter_logs<'a>(
    logs: &'a [ActivityLog],
    filter: &ActivityFilter,
    now: DateTime<Utc>,
) -> Vec<&'a ActivityLog> {
    let term = normalize_search(&filter.search);
    logs.iter()
        .filter(|log| filter.matches_with(log, term.as_deref(), now))
        .collect()
}

/// Counts shown above the activity table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    /// Number of records
    pub total: usize,
    /// Records with a failed status
    pub failed: usize,
    /// Records with high or critical severity
    pub high_or_critical: usize,
    /// Distinct acting users
    pub unique_users: usize,
}

impl ActivitySummary {
    /// Summarize an already filtered set
    pub fn from_logs<L: Borrow<ActivityLog>>(logs: &[L]) -> Self {
        let mut users = HashSet::new();
        let mut summary = Self::default();

        for log in logs {
            let log: &ActivityLog = log.borrow();
            summary.total += 1;
            if log.status == LogStatus::Failed {
                summary.failed += 1;
            }
            if matches!(log.severity, Severity::High | Severity::Critical) {
                summary.high_or_critical += 1;
            }
            users.insert(log.user_id.as_str());
        }

        summary.unique_users = users.len();
        summary
    }
}

/// Per-value counts for the filter badges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts {
    /// Records per category
    pub categories: BTreeMap<LogCategory, usize>,
    /// Records per severity
    pub severities: BTreeMap<Severity, usize>,
    /// Records per status
    pub statuses: BTreeMap<LogStatus, usize>,
}

/// Count records per category, severity and status. Every known value is
/// present, zero when unused.
pub fn facet_counts<L: Borrow<ActivityLog>>(logs: &[L]) -> FacetCounts {
    let mut facets = FacetCounts {
        categories: LogCategory::ALL.iter().map(|c| (*c, 0)).collect(),
        severities: Severity::ALL.iter().map(|s| (*s, 0)).collect(),
        statuses: LogStatus::ALL.iter().map(|s| (*s, 0)).collect(),
    };

    for log in logs {
        let log: &ActivityLog = log.borrow();
        *facets.categories.entry(log.category).or_default() += 1;
        *facets.severities.entry(log.severity).or_default() += 1;
        *facets.statuses.entry(log.status).or_default() += 1;
    }

    facets
}

/// Order logs newest first; ties keep their relative order
pub fn sort_newest_first<L: Borrow<ActivityLog>>(logs: &mut [L]) {
    logs.sort_by_key(|log| {
        std::cmp::Reverse(<L as Borrow<ActivityLog>>::borrow(log).timestamp)
    });
}

/// Receives "view details" events for a single log
pub trait DetailsNotifier: Send + Sync {
    /// Called when the details of `log` are opened
    fn details_viewed(&self, log: &ActivityLog);
}
