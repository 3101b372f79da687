use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::config::{CollectionAccess, SecurityConfig};
use crate::error::ApiError;

/// Enforce the configured access policy on the generic collection routes.
pub async fn collection_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_collection_access(&state.config.security, &headers)?;
    Ok(next.run(request).await)
}

pub fn check_collection_access(security: &SecurityConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    match security.collection_access {
        CollectionAccess::Public => Ok(()),
        CollectionAccess::Token => {
            let expected = security
                .collection_token
                .as_deref()
                .ok_or_else(|| ApiError::unauthorized("Collection access token is not configured"))?;
            let presented = extract_bearer(headers)?;
            if presented == expected {
                Ok(())
            } else {
                Err(ApiError::unauthorized("Invalid collection access token"))
            }
        }
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_str = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(ApiError::unauthorized("Empty bearer token")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}
