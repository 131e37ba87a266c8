use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::repository::errors::RepositoryError;
use crate::usecase::images::ImageError;
use crate::usecase::jwt::JwtError;
use crate::usecase::mailer::MailError;
use crate::usecase::password::PasswordError;

pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

#[derive(Debug, Error)]
pub enum UsecaseError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Duplicate field value: {0}. Please use another value!")]
    DuplicateKey(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// A known path with no handler behind it. Reported as a server error
    /// but still safe to show.
    #[error("{0}")]
    RouteUndefined(String),

    #[error("{0}")]
    Internal(String),
}

impl UsecaseError {
    pub fn kind(&self) -> &'static str {
        match self {
            UsecaseError::Validation(_) => "validation",
            UsecaseError::NotFound(_) => "not_found",
            UsecaseError::Unauthorized(_) => "unauthorized",
            UsecaseError::Forbidden(_) => "forbidden",
            UsecaseError::DuplicateKey(_) => "duplicate_key",
            UsecaseError::RateLimited(_) => "rate_limited",
            UsecaseError::PayloadTooLarge(_) => "payload_too_large",
            UsecaseError::RouteUndefined(_) => "route_undefined",
            UsecaseError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UsecaseError::Validation(_) => StatusCode::BAD_REQUEST,
            UsecaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UsecaseError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            UsecaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            UsecaseError::DuplicateKey(_) => StatusCode::BAD_REQUEST,
            UsecaseError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            UsecaseError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UsecaseError::RouteUndefined(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UsecaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operational errors are safe to show to clients as-is.
    pub fn is_operational(&self) -> bool {
        !matches!(self, UsecaseError::Internal(_))
    }

    pub fn unauthorized() -> Self {
        UsecaseError::Unauthorized(
            "You are not logged in! Please log in to get access.".to_string(),
        )
    }

    pub fn not_found(resource: &str) -> Self {
        UsecaseError::NotFound(format!("No {resource} found with that ID"))
    }
}

/// `fail` for client errors, `error` for server errors.
pub fn status_label(status: StatusCode) -> &'static str {
    if status.is_client_error() { "fail" } else { "error" }
}

/// Everything the error formatting layer needs to re-render a failure.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub status: StatusCode,
    pub message: String,
    pub detail: String,
    pub operational: bool,
}

impl ErrorReport {
    pub fn public_message(&self) -> &str {
        if self.operational {
            &self.message
        } else {
            GENERIC_ERROR_MESSAGE
        }
    }
}

impl From<RepositoryError> for UsecaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => UsecaseError::NotFound("Resource not found".to_string()),
            RepositoryError::DuplicateKey(field) => UsecaseError::DuplicateKey(field),
            RepositoryError::DatabaseError(msg) => UsecaseError::Internal(msg),
        }
    }
}

impl From<JwtError> for UsecaseError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::TokenExpired => UsecaseError::Unauthorized(
                "Your token has expired! Please log in again.".to_string(),
            ),
            JwtError::TokenGenerationError(msg) => UsecaseError::Internal(msg),
            JwtError::TokenValidationError(_) | JwtError::InvalidToken => {
                UsecaseError::Unauthorized("Invalid token. Please log in again!".to_string())
            }
        }
    }
}

impl From<PasswordError> for UsecaseError {
    fn from(e: PasswordError) -> Self {
        UsecaseError::Internal(e.to_string())
    }
}

impl From<MailError> for UsecaseError {
    fn from(e: MailError) -> Self {
        UsecaseError::Internal(e.to_string())
    }
}

impl From<ImageError> for UsecaseError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Decode(_) => UsecaseError::Validation(e.to_string()),
            _ => UsecaseError::Internal(e.to_string()),
        }
    }
}

impl From<ValidationErrors> for UsecaseError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_messages(&errors, "", &mut messages);
        if messages.is_empty() {
            UsecaseError::Validation("Invalid input data.".to_string())
        } else {
            UsecaseError::Validation(format!("Invalid input data. {}", messages.join(". ")))
        }
    }
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    match &error.message {
                        Some(message) => out.push(message.to_string()),
                        None => out.push(format!("Invalid {path}")),
                    }
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

impl IntoResponse for UsecaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            UsecaseError::Internal(_) => {
                tracing::error!(error = %self, "internal error");
            }
            UsecaseError::NotFound(_) => {
                tracing::warn!(error = %self, "resource not found");
            }
            UsecaseError::Forbidden(_) | UsecaseError::Unauthorized(_) => {
                tracing::warn!(error = %self, kind = self.kind(), "access denied");
            }
            _ => {
                tracing::debug!(error = %self);
            }
        }

        let report = ErrorReport {
            kind: self.kind(),
            status,
            message: self.to_string(),
            detail: format!("{self:?}"),
            operational: self.is_operational(),
        };

        let body = json!({
            "status": status_label(status),
            "message": report.public_message(),
        });

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Name too short"))]
        name: String,
        #[validate(range(min = 1))]
        count: i32,
    }

    #[test]
    fn test_status_map() {
        assert_eq!(UsecaseError::Validation(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(UsecaseError::NotFound(String::new()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(UsecaseError::Unauthorized(String::new()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(UsecaseError::Forbidden(String::new()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(UsecaseError::DuplicateKey(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(UsecaseError::RateLimited(String::new()).status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(UsecaseError::Internal(String::new()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(UsecaseError::RouteUndefined(String::new()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(UsecaseError::PayloadTooLarge(String::new()).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_undecodable_upload_is_client_error() {
        let decode = image::load_from_memory(b"plain text").unwrap_err();
        let err = UsecaseError::from(ImageError::Decode(decode));

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Not an image! Please upload only images.");
    }

    #[test]
    fn test_validation_errors_report_every_field() {
        let sample = Sample { name: "ab".to_string(), count: 0 };
        let err = UsecaseError::from(sample.validate().unwrap_err());

        let message = err.to_string();
        assert!(message.starts_with("Invalid input data."));
        assert!(message.contains("Invalid count"));
        assert!(message.contains("Name too short"));
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = UsecaseError::from(RepositoryError::DuplicateKey("name".to_string()));
        assert_eq!(
            err.to_string(),
            "Duplicate field value: name. Please use another value!"
        );
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let err = UsecaseError::from(JwtError::TokenExpired);
        assert!(matches!(err, UsecaseError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_internal_error_hides_message_and_attaches_report() {
        let response = UsecaseError::Internal("pool timed out".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().cloned().unwrap();
        assert_eq!(report.message, "pool timed out");
        assert!(!report.operational);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_operational_error_keeps_message() {
        let response = UsecaseError::not_found("tour").into_response();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["message"], "No tour found with that ID");
    }
}
