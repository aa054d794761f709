use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::admission::{AdmissionRejection, RejectionClass};

/// Stage label for request-shape violations caught before admission
pub const SHAPE_STAGE: &str = "shape";

/// One rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: String,
    stage: Option<&'static str>,
    field: Option<String>,
    errors: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    code: u16,
    timestamp: String,
    correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            stage: None,
            field: None,
            errors: Vec::new(),
        }
    }

    /// 400 for a request body that failed parsing or shape checks. `field`
    /// names the first offender; `errors` lists all of them.
    pub fn shape(errors: Vec<FieldError>) -> Self {
        let message = match errors.as_slice() {
            [single] => format!("Invalid value for '{}': {}", single.field, single.message),
            many => format!("Invalid values for {} fields", many.len()),
        };

        Self {
            status: StatusCode::BAD_REQUEST,
            error: "ValidationError".to_string(),
            message,
            stage: Some(SHAPE_STAGE),
            field: errors.first().map(|e| e.field.clone()),
            errors,
        }
    }

    pub fn bad_request(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl From<AdmissionRejection> for ApiError {
    fn from(rejection: AdmissionRejection) -> Self {
        let (status, error) = match rejection.class {
            RejectionClass::BadInput => (StatusCode::BAD_REQUEST, "ValidationError"),
            RejectionClass::Conflict => (StatusCode::CONFLICT, "DuplicateRegistration"),
            RejectionClass::RiskRejected => (StatusCode::FORBIDDEN, "VerificationFailed"),
            RejectionClass::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        };

        Self {
            status,
            error: error.to_string(),
            message: rejection.reason,
            stage: Some(rejection.stage.as_str()),
            field: rejection.field,
            errors: Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        let payload = ErrorResponse {
            error: self.error,
            message: self.message,
            code: self.status.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: correlation_id.clone(),
            stage: self.stage,
            field: self.field,
            errors: self.errors,
        };

        let mut response = (self.status, Json(payload)).into_response();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response.headers_mut().insert(header::HeaderName::from_static("x-correlation-id"), value);
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
