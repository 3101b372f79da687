//! Generic CRUD routes installed once per registered collection name.
//!
//! ```text
//! GET    /{name}       list, exact-match filter on query parameters
//! POST   /{name}       create from an arbitrary JSON object
//! PUT    /{name}/:id   merge fields into an existing document
//! DELETE /{name}/:id   remove a document
//! ```

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{CollectionName, Document, DocumentStore, DynamicModel, Filter};
use crate::error::ApiError;
use crate::middleware::{collection_access, ApiResponse, ApiResult};

const DOCUMENT_NOT_FOUND: &str = "No document found with the given id";

/// Route set for every name in the registry, behind the collection access policy.
pub fn routes(state: &AppState) -> Router<AppState> {
    let router = state
        .registry
        .names()
        .fold(Router::new(), |router, name| router.merge(collection_routes(name)));

    if state.registry.names().next().is_none() {
        return router;
    }
    router.route_layer(middleware::from_fn_with_state(state.clone(), collection_access))
}

/// The four CRUD routes for one collection.
pub fn collection_routes(name: &CollectionName) -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", name), get(list).post(create))
        .route(&format!("/{}/:id", name), put(update).delete(delete))
        .layer(Extension(name.clone()))
}

/// Gate on connectivity first, then resolve the model and make sure its
/// collection exists.
async fn open(
    state: &AppState,
    collection: &CollectionName,
) -> Result<(Arc<dyn DocumentStore>, Arc<DynamicModel>), ApiError> {
    let store = state.store()?;
    let model = state.registry.get_or_create(collection).await;
    model.ensure_provisioned(store.as_ref()).await?;
    Ok((store, model))
}

/// Ids that do not parse cannot name a stored document.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(DOCUMENT_NOT_FOUND))
}

/// GET /{name} - List documents matching every query parameter
pub async fn list(
    State(state): State<AppState>,
    Extension(collection): Extension<CollectionName>,
    query: Result<Query<Filter>, QueryRejection>,
) -> ApiResult<Vec<Document>> {
    let (store, _) = open(&state, &collection).await?;
    let Query(filter) = query?;

    let docs = store.find(collection.as_str(), &filter).await?;
    Ok(ApiResponse::list(docs))
}

/// POST /{name} - Create a document from the request body
pub async fn create(
    State(state): State<AppState>,
    Extension(collection): Extension<CollectionName>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Document> {
    let (store, model) = open(&state, &collection).await?;
    let Json(body) = body?;

    let fields = model.prepare_insert(body)?;
    let doc = store.insert(collection.as_str(), fields).await?;
    tracing::debug!("Created {} document {}", collection, doc.id);

    Ok(ApiResponse::created(doc).with_message("Document created"))
}

/// PUT /{name}/:id - Merge the body into an existing document
pub async fn update(
    State(state): State<AppState>,
    Extension(collection): Extension<CollectionName>,
    Path(id): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Document> {
    let (store, model) = open(&state, &collection).await?;
    let Json(body) = body?;
    let id = parse_id(&id)?;

    let patch = model.prepare_update(body)?;
    let doc = store
        .update_by_id(collection.as_str(), id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found(DOCUMENT_NOT_FOUND))?;

    Ok(ApiResponse::success(doc).with_message("Document updated"))
}

/// DELETE /{name}/:id - Remove a document
pub async fn delete(
    State(state): State<AppState>,
    Extension(collection): Extension<CollectionName>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let (store, _) = open(&state, &collection).await?;
    let id = parse_id(&id)?;

    store
        .delete_by_id(collection.as_str(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(DOCUMENT_NOT_FOUND))?;
    tracing::debug!("Deleted {} document {}", collection, id);

    Ok(ApiResponse::message("Document deleted"))
}
