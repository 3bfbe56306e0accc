//! HTTP client for the opsdesk API
//!
//! [`OpsdeskClient`] wraps every dashboard endpoint in a typed method and
//! retries transient failures with exponential backoff. It also implements
//! [`opsdesk_api::AdminService`], so code written against the in-process
//! service can run against a remote server unchanged.

#![forbid(unsafe_code)]

pub mod api_client;
pub mod error;
pub mod retry;

pub use api_client::{ExportDownload, OpsdeskClient};
pub use error::{ClientError, Result};
pub use retry::RetryPolicy;
