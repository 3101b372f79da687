use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::role::NewRole;
use crate::database::models::Role;
use crate::database::Filter;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const ROLE_NOT_FOUND: &str = "Role not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list).post(create))
        .route("/roles/:id", get(show).put(update).delete(delete))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(ROLE_NOT_FOUND))
}

/// POST /roles - Create a role; `name` and `code` are required and unique
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewRole>, JsonRejection>,
) -> ApiResult<Role> {
    let roles = state.repository::<Role>()?;
    let Json(body) = body?;

    let role = roles.create(&body.into_role()?).await?;
    tracing::info!("Created role {} ({})", role.name, role.code);
    Ok(ApiResponse::created(role).with_message("Role created"))
}

/// GET /roles
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    let roles = state.repository::<Role>()?;
    Ok(ApiResponse::list(roles.select_any(&Filter::new()).await?))
}

/// GET /roles/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Role> {
    let roles = state.repository::<Role>()?;
    let role = roles
        .select_id(parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found(ROLE_NOT_FOUND))?;
    Ok(ApiResponse::success(role))
}

/// PUT /roles/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Role> {
    let roles = state.repository::<Role>()?;
    let Json(body) = body?;
    let id = parse_id(&id)?;

    let role = roles
        .update_id(id, Role::prepare_update(body)?)
        .await?
        .ok_or_else(|| ApiError::not_found(ROLE_NOT_FOUND))?;
    Ok(ApiResponse::success(role).with_message("Role updated"))
}

/// DELETE /roles/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let roles = state.repository::<Role>()?;
    roles
        .delete_id(parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found(ROLE_NOT_FOUND))?;
    Ok(ApiResponse::message("Role deleted"))
}
