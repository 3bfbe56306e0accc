//! HTTP client for communicating with the opsdesk API

use crate::error::{ClientError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use opsdesk_api::billing::{CheckoutRequest, PortalRequest, RedirectResponse};
use opsdesk_api::handlers::activity::ActivityLogsResponse;
use opsdesk_api::handlers::analytics::AnalyticsResponse;
use opsdesk_api::handlers::billing::BillingSummaryResponse;
use opsdesk_api::handlers::calendar::CalendarMonthResponse;
use opsdesk_api::handlers::health::HealthResponse;
use opsdesk_api::handlers::mail::MailboxResponse;
use opsdesk_api::{AdminCommand, AdminService, CommandOutcome, NewIntegration, ServiceError};
use opsdesk_core::config::ClientConfig;
use opsdesk_core::types::{ActivityLog, EmailFolder, Integration};
use opsdesk_protocol::{ActivityFilter, EmailDraft, ExportFormat};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// A downloaded activity log export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDownload {
    /// File name from `Content-Disposition`
    pub filename: Option<String>,
    /// MIME type of the content
    pub content_type: Option<String>,
    /// Encoded file
    pub content: String,
}

#[derive(Serialize)]
struct ExportParams<'a> {
    format: ExportFormat,
    #[serde(flatten)]
    filter: &'a ActivityFilter,
}

#[derive(Serialize)]
struct MailboxParams<'a> {
    folder: EmailFolder,
    search: &'a str,
}

/// Typed client for the opsdesk API
#[derive(Debug, Clone)]
pub struct OpsdeskClient {
    http: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl OpsdeskClient {
    /// Create a client with default timeout and retry settings
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(&ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    /// Create a client from the `client` configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is unusable or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|_| ClientError::InvalidUrl {
            url: config.base_url.clone(),
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: config.base_url.clone(),
            });
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("opsdesk-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            retry: RetryPolicy::from(config),
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry policy in use
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Server health and store sizes
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the response
    /// cannot be decoded.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json(&["health"], None::<&()>).await
    }

    /// Activity logs matching `filter`, with summary and facets
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the response
    /// cannot be decoded.
    pub async fn activity_logs(&self, filter: &ActivityFilter) -> Result<ActivityLogsResponse> {
        self.get_json(&["api", "activity-logs"], Some(filter)).await
    }

    /// One activity log by id
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 404 if no log has that id.
    pub async fn activity_log(&self, id: &str) -> Result<ActivityLog> {
        self.get_json(&["api", "activity-logs", id], None::<&()>).await
    }

    /// Download the logs matching `filter` as CSV or JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn export_activity_logs(
        &self,
        filter: &ActivityFilter,
        format: ExportFormat,
    ) -> Result<ExportDownload> {
        let url = self.endpoint(&["api", "activity-logs", "export"])?;
        let params = ExportParams { format, filter };
        let response = self.send(self.http.get(url).query(&params)).await?;

        let filename = attachment_filename(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content = response.text().await?;

        Ok(ExportDownload {
            filename,
            content_type,
            content,
        })
    }

    /// KPI summary, trends and funnel drop-offs
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 404 when the server has no
    /// metrics.
    pub async fn kpis(&self) -> Result<AnalyticsResponse> {
        self.get_json(&["api", "analytics", "kpis"], None::<&()>).await
    }

    /// The 42-cell grid of a month with its events
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 400 for an invalid month.
    pub async fn calendar_month(&self, year: i32, month: u32) -> Result<CalendarMonthResponse> {
        let year = year.to_string();
        let month = month.to_string();
        self.get_json(&["api", "calendar", year.as_str(), month.as_str()], None::<&()>)
            .await
    }

    /// Messages of one folder matching `search`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the response
    /// cannot be decoded.
    pub async fn emails(&self, folder: EmailFolder, search: &str) -> Result<MailboxResponse> {
        self.get_json(&["api", "emails"], Some(&MailboxParams { folder, search }))
            .await
    }

    /// Draft produced from an email template
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 404 for an unknown template.
    pub async fn template_draft(&self, template_id: &str) -> Result<EmailDraft> {
        self.get_json(&["api", "email-templates", template_id, "draft"], None::<&()>)
            .await
    }

    /// Payment totals and recurring revenue
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries or the response
    /// cannot be decoded.
    pub async fn billing_summary(&self) -> Result<BillingSummaryResponse> {
        self.get_json(&["api", "billing", "summary"], None::<&()>)
            .await
    }

    /// Hosted checkout URL for a plan
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 400 for the free plan or an
    /// invalid request.
    pub async fn checkout_session(&self, request: &CheckoutRequest) -> Result<RedirectResponse> {
        self.post_json(&["api", "stripe", "create-checkout-session"], request)
            .await
    }

    /// Self-service billing portal URL for a customer
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 400 for an invalid request.
    pub async fn billing_portal(&self, request: &PortalRequest) -> Result<RedirectResponse> {
        self.post_json(&["api", "stripe", "billing-portal"], request)
            .await
    }

    /// Store third-party credentials
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] with 400 when the payload is invalid.
    pub async fn create_integration(&self, integration: &NewIntegration) -> Result<Integration> {
        self.post_json(&["api", "integrations"], integration).await
    }

    /// Run one admin command on the server
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] carrying the server's error code when
    /// the command is rejected.
    pub async fn command(&self, command: &AdminCommand) -> Result<CommandOutcome> {
        self.post_json(&["api", "admin", "commands"], command).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<Q, T>(&self, segments: &[&str], query: Option<&Q>) -> Result<T>
    where
        Q: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.get(self.endpoint(segments)?);
        if let Some(query) = query {
            request = request.query(query);
        }
        decode(self.send(request).await?).await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.endpoint(segments)?).json(body);
        decode(self.send_with(request, Replay::BeforeSend).await?).await
    }

    /// Send an idempotent `request`, retrying retryable failures per the policy
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.send_with(request, Replay::Idempotent).await
    }

    async fn send_with(&self, request: RequestBuilder, replay: Replay) -> Result<Response> {
        let mut retry = 0;
        loop {
            let Some(attempt) = request.try_clone() else {
                return check_status(request.send().await?).await;
            };

            let outcome = match attempt.send().await {
                Ok(response) => check_status(response).await,
                Err(err) => Err(ClientError::from(err)),
            };

            match outcome {
                Err(err) if replay.allows(&err) && retry < self.retry.max_retries => {
                    let delay = self.retry.delay(retry, err.retry_after());
                    retry += 1;
                    warn!(
                        "Request failed (retry {}/{}), sleeping {:?}: {}",
                        retry, self.retry.max_retries, delay, err
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Which failures a request may be sent again after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    /// Reads: any retryable failure
    Idempotent,
    /// Writes: only when the connection was never made, since the server
    /// may already have applied a request that timed out or failed with 5xx
    BeforeSend,
}

impl Replay {
    fn allows(self, err: &ClientError) -> bool {
        match self {
            Self::Idempotent => err.is_retryable(),
            Self::BeforeSend => err.is_connect_failure(),
        }
    }
}

#[async_trait]
impl AdminService for OpsdeskClient {
    async fn execute(&self, command: AdminCommand) -> std::result::Result<CommandOutcome, ServiceError> {
        debug!(command = command.name(), "Sending admin command");
        self.command(&command).await.map_err(ServiceError::from)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_body(status.as_u16(), &body, retry_after))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        message: e.to_string(),
    })
}

fn attachment_filename(headers: &HeaderMap) -> Option<String> {
    let disposition = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    disposition.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        let client = OpsdeskClient::new("http://localhost:8080/").unwrap();
        let url = client.endpoint(&["api", "activity-logs", "log 1/2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/activity-logs/log%201%2F2"
        );
    }

    #[test]
    fn test_writes_are_not_replayed_after_server_errors() {
        let unavailable = ClientError::from_body(503, "busy", None);
        assert!(Replay::Idempotent.allows(&unavailable));
        assert!(!Replay::BeforeSend.allows(&unavailable));

        let limited = ClientError::from_body(429, "slow down", None);
        assert!(!Replay::BeforeSend.allows(&limited));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = OpsdeskClient::new("https://ops.example.com/admin").unwrap();
        let url = client.endpoint(&["health"]).unwrap();
        assert_eq!(url.as_str(), "https://ops.example.com/admin/health");
    }

    #[test]
    fn test_rejects_unusable_base_urls() {
        assert!(matches!(
            OpsdeskClient::new("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            OpsdeskClient::new("mailto:ops@example.com"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_policy_comes_from_config() {
        let config = ClientConfig {
            max_retries: 7,
            ..ClientConfig::default()
        };
        let client = OpsdeskClient::from_config(&config).unwrap();
        assert_eq!(client.retry_policy().max_retries, 7);

        let client = client.with_retry_policy(RetryPolicy::none());
        assert_eq!(client.retry_policy().attempts(), 1);
    }

    #[test]
    fn test_attachment_filename() {
        let mut headers = HeaderMap::new();
        assert_eq!(attachment_filename(&headers), None);

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"activity-logs-2026-10-16.csv\""),
        );
        assert_eq!(
            attachment_filename(&headers).as_deref(),
            Some("activity-logs-2026-10-16.csv")
        );
    }
}
