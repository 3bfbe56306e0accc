//! HTTP request handlers

pub mod activity;
pub mod analytics;
pub mod billing;
pub mod calendar;
pub mod commands;
pub mod health;
pub mod integrations;
pub mod mail;

use crate::service::ServiceError;
use axum::{http::StatusCode, response::Json};
use opsdesk_core::types::ErrorResponse;
use tracing::error;

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Handler result
pub type ApiResult<T> = Result<T, ApiError>;

/// Build an error response
pub fn api_error(status: StatusCode, message: impl Into<String>, code: &str) -> ApiError {
    (status, Json(ErrorResponse::new(message, code)))
}

/// 400 with a validation code
pub fn bad_request(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
}

/// 404 for a missing record
pub fn not_found(resource: &str, id: &str) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("{resource} not found: {id}"),
        "NOT_FOUND",
    )
}

/// 500 for a result the handler cannot use
pub fn internal_error(message: impl Into<String>) -> ApiError {
    let message = message.into();
    error!("Internal error: {}", message);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
}

impl From<ServiceError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: ServiceError) -> Self {
        let status = match err {
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Export { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            error!("Admin service failed: {}", err);
        }
        api_error(status, err.to_string(), err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::not_found("user", "u-9"), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(ServiceError::validation("bad"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR")]
    #[case(
        ServiceError::Export { message: "io".to_string() },
        StatusCode::INTERNAL_SERVER_ERROR,
        "EXPORT_ERROR"
    )]
    #[case(ServiceError::unavailable("down"), StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")]
    fn test_service_error_mapping(
        #[case] err: ServiceError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (actual, Json(body)) = <ApiError>::from(err);
        assert_eq!(actual, status);
        assert_eq!(body.code, code);
    }
}
