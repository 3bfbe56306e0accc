//! Client error types

use opsdesk_api::ServiceError;
use opsdesk_core::types::ErrorResponse;
use std::time::Duration;
use thiserror::Error;

/// Result alias for client calls
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures talking to the API
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("Server returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Machine readable code from the error body, when present
        code: Option<String>,
        /// Error message from the body, or the raw body
        message: String,
        /// Delay requested by a `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// The response body did not match the expected shape
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// The base URL cannot carry request paths
    #[error("Invalid base URL: {url}")]
    InvalidUrl {
        /// Offending URL
        url: String,
    },
}

impl ClientError {
    /// Build a status error from a response body
    ///
    /// Bodies in the server's `{error, code}` shape are unpacked; anything
    /// else is kept verbatim as the message.
    #[must_use]
    pub fn from_body(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => Self::Status {
                status,
                code: Some(parsed.code),
                message: parsed.error,
                retry_after,
            },
            Err(_) => Self::Status {
                status,
                code: None,
                message: body.trim().to_string(),
                retry_after,
            },
        }
    }

    /// Whether sending the same request again may succeed
    ///
    /// True for connection failures and timeouts, 408, 429 and every 5xx.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_connect() || err.is_timeout(),
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Decode { .. } | Self::InvalidUrl { .. } => false,
        }
    }

    /// Whether the connection failed, so the request never reached the server
    #[must_use]
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_connect())
    }

    /// Server-requested delay before the next attempt
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status, when the server answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        let (status, code, message) = match err {
            ClientError::Status {
                status,
                code,
                message,
                ..
            } => (status, code, message),
            other => return Self::unavailable(other.to_string()),
        };

        match code.as_deref() {
            Some("NOT_FOUND") => message.split_once(" not found: ").map_or_else(
                || Self::not_found("record", &message),
                |(resource, id)| Self::not_found(resource, id),
            ),
            Some("VALIDATION_ERROR" | "BAD_REQUEST") => Self::validation(
                message
                    .strip_prefix("Validation failed: ")
                    .unwrap_or(&message),
            ),
            Some("EXPORT_ERROR") => Self::Export {
                message: message
                    .strip_prefix("Export failed: ")
                    .unwrap_or(&message)
                    .to_string(),
            },
            _ => Self::unavailable(format!("{status}: {message}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn status(code: u16) -> ClientError {
        ClientError::Status {
            status: code,
            code: None,
            message: String::new(),
            retry_after: None,
        }
    }

    #[rstest]
    #[case(408, true)]
    #[case(429, true)]
    #[case(500, true)]
    #[case(503, true)]
    #[case(400, false)]
    #[case(401, false)]
    #[case(404, false)]
    #[case(409, false)]
    fn test_status_retryability(#[case] code: u16, #[case] expected: bool) {
        assert_eq!(status(code).is_retryable(), expected);
    }

    #[test]
    fn test_decode_errors_are_final() {
        let err = ClientError::Decode {
            message: "eof".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_builder_errors_are_final() {
        let err = ClientError::from(
            reqwest::Client::new()
                .get("not a url")
                .build()
                .unwrap_err(),
        );
        assert!(!err.is_retryable());
        assert!(!err.is_connect_failure());
    }

    #[test]
    fn test_from_body_unpacks_error_response() {
        let err = ClientError::from_body(
            404,
            r#"{"error":"user not found: u-9","code":"NOT_FOUND"}"#,
            None,
        );
        match err {
            ClientError::Status { status, code, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("NOT_FOUND"));
                assert_eq!(message, "user not found: u-9");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_body_keeps_plain_text() {
        let err = ClientError::from_body(502, "  bad gateway\n", Some(Duration::from_secs(1)));
        assert_eq!(err.to_string(), "Server returned 502: bad gateway");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_not_found_maps_back_to_resource_and_id() {
        let err = ClientError::from_body(
            404,
            r#"{"error":"feature flag not found: beta.x","code":"NOT_FOUND"}"#,
            None,
        );
        assert_eq!(
            ServiceError::from(err),
            ServiceError::not_found("feature flag", "beta.x")
        );
    }

    #[test]
    fn test_validation_prefix_is_not_doubled() {
        let err = ClientError::from_body(
            400,
            r#"{"error":"Validation failed: patch changes nothing","code":"VALIDATION_ERROR"}"#,
            None,
        );
        assert_eq!(
            ServiceError::from(err),
            ServiceError::validation("patch changes nothing")
        );
    }

    #[test]
    fn test_server_errors_become_unavailable() {
        let err = ClientError::from_body(503, "down", None);
        assert_eq!(
            ServiceError::from(err),
            ServiceError::unavailable("503: down")
        );
    }
}
