use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::models::Entity;
use crate::database::{CollectionRegistry, DocumentStore, Repository, StoreHandle};
use crate::error::ApiError;
use crate::handlers;

/// Shared per-request state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: StoreHandle,
    pub registry: Arc<CollectionRegistry>,
}

impl AppState {
    pub fn new(config: AppConfig, store: StoreHandle, registry: CollectionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            store,
            registry: Arc::new(registry),
        }
    }

    /// The connected store, or 503 when there is none.
    pub fn store(&self) -> Result<Arc<dyn DocumentStore>, ApiError> {
        Ok(self.store.store()?)
    }

    pub fn repository<T: Entity>(&self) -> Result<Repository<T>, ApiError> {
        Ok(Repository::new(self.store()?))
    }
}

pub fn app(state: AppState) -> Router {
    let expose_panics = state.config.environment.is_development();

    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        // Fixed entities
        .merge(handlers::test_data::routes())
        .merge(handlers::users::routes())
        .merge(handlers::roles::routes())
        // Generic collections, one route set per registered name
        .merge(handlers::collections::routes(&state))
        .fallback(handlers::system::not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security))
        .layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
            panic_response(err, expose_panics)
        }))
        .layer(
            // Request lines at INFO so the default filter shows method and URI
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origin = if security.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(security.cors_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| tracing::warn!("ignoring invalid CORS origin: {}", o))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Last-resort 500 for a handler that panicked. The panic text is only shown
/// in development.
fn panic_response(err: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);

    let mut body = json!({
        "success": false,
        "message": "Internal server error",
        "code": "INTERNAL_SERVER_ERROR",
    });
    if expose {
        body["error"] = json!(detail);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
