//! Month grid construction and event placement
//!
//! Event times are wall-clock times. Placement compares the calendar date of
//! an event's start with the cell date; no time zone is involved. Recurrence
//! descriptors ride along with their event and never produce extra cells.

use chrono::{Datelike, Days, NaiveDate};
use opsdesk_core::types::CalendarEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cells in a month grid: six weeks of seven days
pub const GRID_CELLS: usize = 42;

/// Calendar errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Month outside 1-12
    #[error("Invalid month {month}: expected 1-12")]
    InvalidMonth {
        /// Requested month
        month: u32,
    },

    /// Year outside the supported date range
    #[error("Year {year} is out of range")]
    YearOutOfRange {
        /// Requested year
        year: i32,
    },
}

/// One day in a month grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    /// The day
    pub date: NaiveDate,
    /// Falls in the requested month rather than the padding
    pub is_current_month: bool,
    /// Equals the supplied "today"
    pub is_today: bool,
}

/// A grid cell with the events that start on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    /// The cell
    #[serde(flatten)]
    pub cell: CalendarCell,
    /// Events starting that day, earliest first
    pub events: Vec<CalendarEvent>,
}

/// Build the 42-cell grid for `month` of `year`, starting on the Sunday on or
/// before the 1st
///
/// # Errors
///
/// Returns [`CalendarError::InvalidMonth`] for a month outside 1-12 and
/// [`CalendarError::YearOutOfRange`] when the grid would leave the
/// representable date range.
pub fn month_grid(year: i32, month: u32, today: NaiveDate) -> Result<Vec<CalendarCell>, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth { month });
    }

    let first =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::YearOutOfRange { year })?;
    let lead = u64::from(first.weekday().num_days_from_sunday());
    let start = first
        .checked_sub_days(Days::new(lead))
        .ok_or(CalendarError::YearOutOfRange { year })?;

    let cells: Vec<CalendarCell> = start
        .iter_days()
        .take(GRID_CELLS)
        .map(|date| CalendarCell {
            date,
            is_current_month: date.year() == year && date.month() == month,
            is_today: date == today,
        })
        .collect();

    if cells.len() == GRID_CELLS {
        Ok(cells)
    } else {
        Err(CalendarError::YearOutOfRange { year })
    }
}

/// Events whose start falls on `date`, ordered by start time
#[must_use]
pub fn events_on(events: &[CalendarEvent], date: NaiveDate) -> Vec<&CalendarEvent> {
    let mut day: Vec<&CalendarEvent> = events.iter().filter(|e| e.start.date() == date).collect();
    day.sort_by_key(|e| e.start);
    day
}

/// Attach events to the cells they start on
#[must_use]
pub fn populate(grid: &[CalendarCell], events: &[CalendarEvent]) -> Vec<CalendarDay> {
    grid.iter()
        .map(|cell| CalendarDay {
            cell: *cell,
            events: events_on(events, cell.date).into_iter().cloned().collect(),
        })
        .collect()
}
