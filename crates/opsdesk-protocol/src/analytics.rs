//! KPI aggregation over daily metric series and conversion funnels

use opsdesk_core::types::{DailyMetric, FunnelStep};
use opsdesk_core::utils::round_to;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Percent change beyond which a metric counts as moving
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Samples per comparison window for period-over-period trends
pub const TREND_WINDOW: usize = 7;

/// Analytics errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// No samples to aggregate
    #[error("Metric series is empty")]
    EmptySeries,
}

/// Direction of a metric between two values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Increased by more than the threshold
    Up,
    /// Decreased by more than the threshold
    Down,
    /// Within the threshold
    Flat,
}

impl Trend {
    /// Classify the move from `previous` to `current`
    #[must_use]
    pub fn between(current: f64, previous: f64) -> Self {
        match percent_change(current, previous) {
            Some(delta) if delta > TREND_THRESHOLD_PERCENT => Self::Up,
            Some(delta) if delta < -TREND_THRESHOLD_PERCENT => Self::Down,
            Some(_) => Self::Flat,
            None if current > 0.0 => Self::Up,
            None => Self::Flat,
        }
    }
}

/// `(current - previous) / |previous| * 100`, `None` when `previous` is zero
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous.abs() * 100.0)
    }
}

fn mean(series: &[DailyMetric], value: impl Fn(&DailyMetric) -> f64) -> f64 {
    series.iter().map(value).sum::<f64>() / series.len() as f64
}

/// Headline numbers of the analytics page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    /// Mean daily active users
    pub avg_daily_active_users: f64,
    /// Mean session length in seconds
    pub avg_session_duration_secs: f64,
    /// Mean bounce rate in percent
    pub avg_bounce_rate: f64,
    /// Revenue summed over the series
    pub total_revenue: f64,
    /// End-to-end funnel conversion in percent
    pub conversion_rate: Option<f64>,
    /// MRR of the most recent sample
    pub current_mrr: f64,
}

impl KpiSummary {
    /// Aggregate a daily series and a funnel
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::EmptySeries`] when `series` has no samples.
    pub fn compute(series: &[DailyMetric], funnel: &[FunnelStep]) -> Result<Self, AnalyticsError> {
        let last = series.last().ok_or(AnalyticsError::EmptySeries)?;

        Ok(Self {
            avg_daily_active_users: mean(series, |m| m.active_users as f64),
            avg_session_duration_secs: mean(series, |m| m.avg_session_duration_secs),
            avg_bounce_rate: mean(series, |m| m.bounce_rate),
            total_revenue: series.iter().map(|m| m.revenue).sum(),
            conversion_rate: conversion_rate(funnel),
            current_mrr: last.mrr,
        })
    }
}

/// Share of first-step users that reach the last step, in percent with two
/// decimals. `None` for an empty funnel or one whose first step has no users.
#[must_use]
pub fn conversion_rate(funnel: &[FunnelStep]) -> Option<f64> {
    let (first, last) = (funnel.first()?, funnel.last()?);
    if first.users == 0 {
        return None;
    }
    Some(round_to(
        last.users as f64 / first.users as f64 * 100.0,
        2,
    ))
}

/// Loss between two adjacent funnel steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelDropoff {
    /// Earlier step
    pub from: String,
    /// Later step
    pub to: String,
    /// Users lost between the steps
    pub lost_users: i64,
    /// Lost users as a share of the earlier step, in percent
    pub dropoff_percent: f64,
}

/// Stage-to-stage drop-off of a funnel
#[must_use]
pub fn funnel_dropoffs(funnel: &[FunnelStep]) -> Vec<FunnelDropoff> {
    funnel
        .iter()
        .zip(funnel.iter().skip(1))
        .map(|(from, to)| {
            let lost = i64::try_from(from.users).unwrap_or(i64::MAX)
                - i64::try_from(to.users).unwrap_or(i64::MAX);
            let dropoff_percent = if from.users == 0 {
                0.0
            } else {
                round_to(lost as f64 / from.users as f64 * 100.0, 2)
            };
            FunnelDropoff {
                from: from.name.clone(),
                to: to.name.clone(),
                lost_users: lost,
                dropoff_percent,
            }
        })
        .collect()
}

/// Last-week-versus-the-week-before direction per metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTrends {
    /// Daily active users
    pub active_users: Trend,
    /// Sessions
    pub sessions: Trend,
    /// Session length
    pub session_duration: Trend,
    /// Bounce rate
    pub bounce_rate: Trend,
    /// Revenue
    pub revenue: Trend,
    /// Churn rate
    pub churn_rate: Trend,
}

impl Default for PeriodTrends {
    fn default() -> Self {
        Self {
            active_users: Trend::Flat,
            sessions: Trend::Flat,
            session_duration: Trend::Flat,
            bounce_rate: Trend::Flat,
            revenue: Trend::Flat,
            churn_rate: Trend::Flat,
        }
    }
}

impl PeriodTrends {
    /// Compare the mean of the last [`TREND_WINDOW`] samples against the
    /// window before it. Shorter series are flat across the board.
    #[must_use]
    pub fn from_series(series: &[DailyMetric]) -> Self {
        let Some(start) = series.len().checked_sub(TREND_WINDOW * 2) else {
            return Self::default();
        };
        let (previous, current) = series
            .get(start..)
            .unwrap_or_default()
            .split_at(TREND_WINDOW);
        let trend = |value: fn(&DailyMetric) -> f64| {
            Trend::between(mean(current, value), mean(previous, value))
        };

        Self {
            active_users: trend(|m| m.active_users as f64),
            sessions: trend(|m| m.sessions as f64),
            session_duration: trend(|m| m.avg_session_duration_secs),
            bounce_rate: trend(|m| m.bounce_rate),
            revenue: trend(|m| m.revenue),
            churn_rate: trend(|m| m.churn_rate),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn step(name: &str, users: u64) -> FunnelStep {
        FunnelStep {
            name: name.to_string(),
            users,
        }
    }

    fn metric(day: u32, active_users: u64, revenue: f64, mrr: f64) -> DailyMetric {
        DailyMetric {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Days::new(u64::from(day)),
            active_users,
            new_users: 10,
            sessions: active_users * 2,
            avg_session_duration_secs: 240.0,
            bounce_rate: 40.0,
            revenue,
            churn_rate: 2.0,
            mrr,
        }
    }

    #[test]
    fn test_reference_funnel_conversion() {
        let funnel = vec![
            step("Visited", 25_000),
            step("Signed up", 3_500),
            step("Activated", 2_800),
            step("Trial", 2_100),
            step("Paid", 420),
        ];
        assert_eq!(conversion_rate(&funnel), Some(1.68));
    }

    #[rstest]
    #[case(vec![step("a", 500), step("b", 500)], Some(100.0))]
    #[case(vec![step("a", 500), step("b", 0)], Some(0.0))]
    #[case(vec![step("only", 7)], Some(100.0))]
    #[case(vec![step("a", 0), step("b", 0)], None)]
    #[case(vec![], None)]
    fn test_conversion_rate_edges(#[case] funnel: Vec<FunnelStep>, #[case] expected: Option<f64>) {
        assert_eq!(conversion_rate(&funnel), expected);
    }

    #[test]
    fn test_kpi_summary() {
        let series = vec![
            metric(0, 100, 10.0, 1_000.0),
            metric(1, 200, 20.5, 1_100.0),
            metric(2, 300, 30.0, 1_250.0),
        ];
        let funnel = vec![step("Visited", 1_000), step("Paid", 25)];

        let kpis = KpiSummary::compute(&series, &funnel).unwrap();

        assert_eq!(kpis.avg_daily_active_users, 200.0);
        assert_eq!(kpis.avg_session_duration_secs, 240.0);
        assert_eq!(kpis.avg_bounce_rate, 40.0);
        assert_eq!(kpis.total_revenue, 60.5);
        assert_eq!(kpis.conversion_rate, Some(2.5));
        assert_eq!(kpis.current_mrr, 1_250.0);
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert_eq!(
            KpiSummary::compute(&[], &[step("a", 1)]),
            Err(AnalyticsError::EmptySeries)
        );
    }

    #[rstest]
    #[case(106.0, 100.0, Trend::Up)]
    #[case(105.0, 100.0, Trend::Flat)]
    #[case(95.0, 100.0, Trend::Flat)]
    #[case(94.0, 100.0, Trend::Down)]
    #[case(-90.0, -100.0, Trend::Up)]
    #[case(3.0, 0.0, Trend::Up)]
    #[case(0.0, 0.0, Trend::Flat)]
    #[case(-3.0, 0.0, Trend::Flat)]
    fn test_trend_thresholds(#[case] current: f64, #[case] previous: f64, #[case] expected: Trend) {
        assert_eq!(Trend::between(current, previous), expected);
    }

    #[test]
    fn test_funnel_dropoffs() {
        let funnel = vec![step("Visited", 1_000), step("Signed up", 250), step("Paid", 0)];
        let dropoffs = funnel_dropoffs(&funnel);

        assert_eq!(dropoffs.len(), 2);
        assert_eq!(dropoffs[0].from, "Visited");
        assert_eq!(dropoffs[0].lost_users, 750);
        assert_eq!(dropoffs[0].dropoff_percent, 75.0);
        assert_eq!(dropoffs[1].dropoff_percent, 100.0);
        assert!(funnel_dropoffs(&funnel[..1]).is_empty());
    }

    #[test]
    fn test_period_trends_need_two_windows() {
        let short: Vec<_> = (0..13).map(|d| metric(d, 100, 1.0, 1.0)).collect();
        assert_eq!(PeriodTrends::from_series(&short), PeriodTrends::default());
    }

    #[test]
    fn test_period_trends_compare_last_two_weeks() {
        let series: Vec<_> = (0..14)
            .map(|d| {
                if d < 7 {
                    metric(d, 100, 50.0, 1.0)
                } else {
                    metric(d, 120, 40.0, 1.0)
                }
            })
            .collect();

        let trends = PeriodTrends::from_series(&series);

        assert_eq!(trends.active_users, Trend::Up);
        assert_eq!(trends.sessions, Trend::Up);
        assert_eq!(trends.revenue, Trend::Down);
        assert_eq!(trends.bounce_rate, Trend::Flat);
    }

    proptest! {
        #[test]
        fn test_conversion_rate_formula(first in 1u64..1_000_000, last in 0u64..1_000_000) {
            let funnel = vec![step("first", first), step("mid", first / 2), step("last", last)];
            let expected = (last as f64 / first as f64 * 100.0 * 100.0).round() / 100.0;
            prop_assert_eq!(conversion_rate(&funnel), Some(expected));
        }

        #[test]
        fn test_total_revenue_is_sum(revenues in proptest::collection::vec(0.0f64..10_000.0, 1..30)) {
            let series: Vec<_> = revenues
                .iter()
                .enumerate()
                .map(|(i, r)| metric(u32::try_from(i).unwrap(), 1, *r, 0.0))
                .collect();
            let kpis = KpiSummary::compute(&series, &[]).unwrap();
            let expected: f64 = revenues.iter().sum();
            prop_assert!((kpis.total_revenue - expected).abs() < 1e-6);
            prop_assert_eq!(kpis.conversion_rate, None);
        }
    }
}
