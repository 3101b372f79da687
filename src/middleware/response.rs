use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Wrapper for API responses that adds the `{success, message?, count?, data?}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub count: Option<usize>,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            count: None,
            status_code: None, // Default to 200 OK
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            status_code: Some(StatusCode::CREATED),
            ..Self::success(data)
        }
    }

    /// Attach a human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// A list response; `count` mirrors the number of items
    pub fn list(items: Vec<T>) -> Self {
        Self {
            count: Some(items.len()),
            ..Self::success(items)
        }
    }
}

impl ApiResponse<()> {
    /// A 200 response carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            count: None,
            status_code: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));
        if let Some(message) = self.message {
            envelope.insert("message".to_string(), Value::String(message));
        }
        if let Some(count) = self.count {
            envelope.insert("count".to_string(), json!(count));
        }
        if let Some(data) = self.data {
            // Convert data to JSON Value for consistent envelope format
            match serde_json::to_value(&data) {
                Ok(value) => {
                    envelope.insert("data".to_string(), value);
                }
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "message": "Failed to serialize response data",
                            "error": e.to_string()
                        })),
                    )
                        .into_response();
                }
            }
        }

        (status, Json(Value::Object(envelope))).into_response()
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_sets_count() {
        let response = ApiResponse::list(vec![1, 2, 3]);
        assert_eq!(response.count, Some(3));
        assert_eq!(response.status_code, None);
    }

    #[test]
    fn created_keeps_message() {
        let response = ApiResponse::created("x").with_message("done");
        assert_eq!(response.status_code, Some(StatusCode::CREATED));
        assert_eq!(response.message.as_deref(), Some("done"));
    }

    #[test]
    fn message_only_has_no_data() {
        let response = ApiResponse::message("deleted");
        assert!(response.data.is_none());
        assert_eq!(response.into_response().status(), StatusCode::OK);
    }
}
