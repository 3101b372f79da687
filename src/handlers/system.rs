use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Describe the service and its routes
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let collections: Vec<&str> = state.registry.names().map(|n| n.as_str()).collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "docstore-api",
            "version": version,
            "endpoints": {
                "health": "/health",
                "users": "/users[/:id], /users/login",
                "roles": "/roles[/:id]",
                "test": "/test, /data",
                "collections": "/{collection}[/:id]",
            },
            "collections": collections,
        }
    }))
}

/// GET /health - Liveness plus the current database status. Always 200.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match state.store.health_check().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::debug!("Health check: {}", e);
            "disconnected"
        }
    };

    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "database": database,
            "timestamp": chrono::Utc::now(),
        }
    }))
}

/// Fallback for unmatched routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
            "code": "NOT_FOUND",
        })),
    )
}
