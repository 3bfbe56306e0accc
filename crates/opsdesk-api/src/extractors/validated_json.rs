//! Validated JSON extractor

use crate::extractors::ExtractorError;
use axum::{
    Json, async_trait,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that has passed its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ExtractorError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ExtractorError::bad_request(format!("Invalid JSON: {}", err.body_text())))?;

        data.validate()
            .map_err(|errors| ExtractorError::validation(format!("Validation failed: {errors}")))?;

        Ok(Self(data))
    }
}

impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(length(min = 1, max = 10))]
        name: String,
        #[validate(email)]
        email: String,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let ValidatedJson(signup) = ValidatedJson::<Signup>::from_request(
            request(r#"{"name":"Ada","email":"ada@opsdesk.dev"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(signup.name, "Ada");
        assert_eq!(signup.email, "ada@opsdesk.dev");
    }

    #[tokio::test]
    async fn test_invalid_field_is_validation_error() {
        let Err(err) = ValidatedJson::<Signup>::from_request(
            request(r#"{"name":"Ada","email":"nope"}"#),
            &(),
        )
        .await
        else {
            panic!("expected rejection");
        };
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let Err(err) = ValidatedJson::<Signup>::from_request(request("{"), &()).await else {
            panic!("expected rejection");
        };
        assert_eq!(err.code, "BAD_REQUEST");
    }
}
