//! Dashboard logic for opsdesk
//!
//! Everything in this crate is a pure function over in-memory records: no
//! async, no I/O. The API server and the tests call into it directly.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod activity;
pub mod analytics;
pub mod billing;
pub mod calendar;
pub mod export;
pub mod mailbox;

pub use activity::{
    ActivityFilter, ActivitySummary, DateRange, DetailsNotifier, FacetCounts, Selection,
    facet_counts, filter_logs, sort_newest_first,
};
pub use analytics::{
    AnalyticsError, FunnelDropoff, KpiSummary, PeriodTrends, Trend, conversion_rate,
    funnel_dropoffs,
};
pub use billing::{PaymentSummary, monthly_equivalent, mrr};
pub use calendar::{CalendarCell, CalendarDay, CalendarError, GRID_CELLS, events_on, month_grid, populate};
pub use export::{ExportError, ExportFormat, ExportedFile, export_file, export_logs};
pub use mailbox::{EmailDraft, TemplateExt, filter_emails, unread_counts};
