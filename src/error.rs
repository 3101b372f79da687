// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::database::models::ModelError;
use crate::database::StoreError;

pub const DATABASE_UNAVAILABLE: &str = "Database not connected; check the DATABASE_URL configuration";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error, `error` carries the underlying message
    InternalServerError { message: String, error: String },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-facing error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code(),
        });
        if let ApiError::InternalServerError { error, .. } = self {
            body["error"] = json!(error);
        }
        body
    }

    /// Replace the client message of an internal error, keeping the
    /// underlying cause. Other variants pass through untouched.
    pub fn context(self, message: impl Into<String>) -> Self {
        match self {
            ApiError::InternalServerError { error, .. } => {
                ApiError::InternalServerError { message: message.into(), error }
            }
            other => other,
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(error: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: "Internal server error".to_string(),
            error: error.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => {
                tracing::debug!("Store unavailable: {}", reason);
                ApiError::service_unavailable(DATABASE_UNAVAILABLE)
            }
            StoreError::UniqueViolation { field, .. } => {
                ApiError::bad_request(format!("A record with this {} already exists", field))
            }
            StoreError::InvalidCollection(name) => {
                ApiError::bad_request(format!("Invalid collection name: {}", name))
            }
            other => {
                tracing::error!("Store error: {}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Required(_) => ApiError::bad_request(err.to_string()),
            // Cast failures surface like any other store-side failure
            other => ApiError::internal_server_error(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InternalServerError { message, error } => write!(f, "{}: {}", message, error),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let unavailable: ApiError = StoreError::Unavailable("pool timed out".into()).into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.message(), DATABASE_UNAVAILABLE);

        let duplicate: ApiError = StoreError::UniqueViolation {
            collection: "users".into(),
            field: "username".into(),
        }
        .into();
        assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);

        let query: ApiError = StoreError::Query("relation does not exist".into()).into();
        assert_eq!(query.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(query.to_json()["error"], "Query error: relation does not exist");
    }

    #[test]
    fn model_errors_split_between_400_and_500() {
        let required: ApiError = ModelError::Required("username".into()).into();
        assert_eq!(required.status_code(), StatusCode::BAD_REQUEST);

        let cast: ApiError = ModelError::InvalidString { field: "name".into(), value: "{}".into() }.into();
        assert_eq!(cast.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_shape() {
        let body = ApiError::not_found("gone").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "gone");
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn context_rewrites_only_internal_messages() {
        let err = ApiError::internal_server_error("boom").context("Failed to create user");
        assert_eq!(err.message(), "Failed to create user");
        assert_eq!(err.to_json()["error"], "boom");

        let err = ApiError::not_found("gone").context("ignored");
        assert_eq!(err.message(), "gone");
    }
}
