//! CSV and JSON encoding of activity logs

use chrono::{NaiveDate, SecondsFormat};
use opsdesk_core::types::ActivityLog;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::str::FromStr;
use thiserror::Error;

/// Column order of the CSV export
pub const CSV_HEADER: [&str; 11] = [
    "id",
    "timestamp",
    "user_id",
    "user_name",
    "user_email",
    "action",
    "category",
    "severity",
    "status",
    "description",
    "ip_address",
];

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV encoding failed
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failed
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Flushing the encoder failed
    #[error("Failed to flush export buffer: {0}")]
    Flush(String),
}

/// Download format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma separated values with a header row
    #[default]
    Csv,
    /// Pretty printed JSON array
    Json,
}

impl ExportFormat {
    /// MIME type of the encoded file
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// File extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = opsdesk_core::Error;

    fn from_str(s: &str) -> opsdesk_core::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(opsdesk_core::Error::validation(
                "format",
                format!("unsupported export format '{other}'"),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ExportFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::activity::parse_str(deserializer)
    }
}

/// An encoded export ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Suggested file name
    pub filename: String,
    /// MIME type
    pub content_type: &'static str,
    /// Encoded contents
    pub bytes: Vec<u8>,
}

/// Encode `logs` in `format`
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn export_logs<L: Borrow<ActivityLog>>(
    logs: &[L],
    format: ExportFormat,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => encode_csv(logs),
        ExportFormat::Json => {
            let records: Vec<&ActivityLog> = logs
                .iter()
                .map(<L as Borrow<ActivityLog>>::borrow)
                .collect();
            Ok(serde_json::to_vec_pretty(&records)?)
        }
    }
}

fn encode_csv<L: Borrow<ActivityLog>>(logs: &[L]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for log in logs {
        let log: &ActivityLog = log.borrow();
        let timestamp = log.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        writer.write_record([
            log.id.as_str(),
            timestamp.as_str(),
            log.user_id.as_str(),
            log.user_name.as_str(),
            log.user_email.as_str(),
            log.action.as_str(),
            log.category.as_str(),
            log.severity.as_str(),
            log.status.as_str(),
            log.description.as_str(),
            log.ip_address.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))
}

/// Suggested download name for an export made on `date`
#[must_use]
pub fn export_filename(format: ExportFormat, date: NaiveDate) -> String {
    opsdesk_core::utils::export_filename("activity-logs", date, format.extension())
}

/// Encode `logs` and attach the download metadata
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn export_file<L: Borrow<ActivityLog>>(
    logs: &[L],
    format: ExportFormat,
    date: NaiveDate,
) -> Result<ExportedFile, ExportError> {
    Ok(ExportedFile {
        filename: export_filename(format, date),
        content_type: format.content_type(),
        bytes: export_logs(logs, format)?,
    })
}
