//! `ValidatedJson<T>`: a `Json<T>` that also enforces request shape.
//!
//! Parse failures and shape violations become an `ApiError` with stage
//! `shape`, so every 400 the service emits has the same body whether it
//! came from here or from the admission pipeline.

use std::ops::RangeInclusive;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use super::validators::validate_length;
use crate::error::{ApiError, FieldError};

/// Request bodies with bounded lengths and numeric ranges
pub trait Validatable {
    /// Every violated field, in declaration order
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Collects shape violations without stopping at the first one.
#[derive(Debug, Default)]
pub struct ShapeChecks {
    errors: Vec<FieldError>,
}

impl ShapeChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Character count of `value` must lie within `bounds`.
    pub fn length(&mut self, field: &str, value: &str, bounds: RangeInclusive<usize>) -> &mut Self {
        if let Err(message) = validate_length(value, *bounds.start(), *bounds.end()) {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn reject_if(
        &mut self,
        violated: bool,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        if violated {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validatable + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "request body rejected");
            ApiError::shape(vec![FieldError::new("body", describe(&rejection))])
        })?;

        data.validate().map_err(ApiError::shape)?;
        Ok(ValidatedJson(data))
    }
}

fn describe(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {}", e.body_text()),
        JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {}", e.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            "Content-Type must be application/json".to_string()
        }
        JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
        _ => "Invalid JSON payload".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
    };
    use shared::models::Submission;

    fn registration_body() -> serde_json::Value {
        serde_json::json!({
            "open_channel_id": "-1001111111111",
            "open_channel_title": "Signals",
            "open_channel_description": "Free daily signals",
            "closed_channel_id": "-1002222222222",
            "closed_channel_title": "Signals VIP",
            "closed_channel_description": "Paid signals",
            "client_wallet_address": "0x52908400098527886E0F7030069857D2E4169EE7",
            "client_payout_currency": "USDT",
            "client_payout_network": "ETH",
            "captcha_token": "token"
        })
    }

    fn request(content_type: Option<&str>, body: String) -> Request {
        let mut builder = Request::builder().method("POST").uri("/api/v1/register");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn extract(req: Request) -> Result<ValidatedJson<Submission>, ApiError> {
        ValidatedJson::<Submission>::from_request(req, &()).await
    }

    #[test]
    fn test_shape_checks_collect_every_channel_field() {
        let mut checks = ShapeChecks::new();
        checks
            .length("open_channel_title", "", 1..=200)
            .length("closed_channel_title", "Signals VIP", 1..=200)
            .reject_if(true, "sub_2_time", "must be at least 1 day");

        let errors = checks.finish().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["open_channel_title", "sub_2_time"]);
    }

    #[test]
    fn test_shape_length_counts_characters() {
        let mut checks = ShapeChecks::new();
        checks.length("client_payout_network", "ÉT", 2..=20);
        assert!(checks.finish().is_ok());
    }

    #[tokio::test]
    async fn test_registration_body_is_extracted() {
        let req = request(Some("application/json"), registration_body().to_string());
        let ValidatedJson(submission) = extract(req).await.unwrap();
        assert_eq!(submission.client_payout_network, "ETH");
        assert!(submission.sub_1_price.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_body_error() {
        let req = request(Some("application/json"), "{\"open_channel_id\":".to_string());
        let error = extract(req).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.errors()[0].field, "body");
        assert!(error.errors()[0].message.starts_with("JSON syntax error"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_rejected() {
        let req = request(None, registration_body().to_string());
        let error = extract(req).await.unwrap_err();
        assert_eq!(error.errors()[0].message, "Content-Type must be application/json");
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_a_data_error() {
        let mut body = registration_body();
        body["sub_1_time"] = serde_json::json!("thirty");
        let req = request(Some("application/json"), body.to_string());
        let error = extract(req).await.unwrap_err();
        assert!(error.errors()[0].message.starts_with("Invalid JSON data"));
    }

    #[tokio::test]
    async fn test_shape_violations_follow_parsing() {
        let mut body = registration_body();
        body["client_payout_currency"] = serde_json::json!("U");
        let req = request(Some("application/json"), body.to_string());
        let error = extract(req).await.unwrap_err();
        assert_eq!(error.errors().len(), 1);
        assert_eq!(error.errors()[0].field, "client_payout_currency");
    }
}
