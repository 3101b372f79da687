use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::user::{LoginRequest, NewUser};
use crate::database::models::{User, UserProfile};
use crate::database::{Filter, StoreError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const USER_NOT_FOUND: &str = "User not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/login", post(login))
        .route("/users/:id", get(show).put(update).delete(delete))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(USER_NOT_FOUND))
}

/// POST /users - Create a user; `username` and `password` are required
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let users = state.repository::<User>()?;
    let Json(body) = body?;

    let user = body
        .into_user()
        .map_err(|_| ApiError::bad_request("username and password are required"))?;

    // Uniqueness is enforced by the store; a duplicate fails the insert itself
    let user = users.create(&user).await.map_err(|e| match e {
        StoreError::UniqueViolation { .. } => ApiError::bad_request("Username already exists"),
        other => ApiError::from(other).context("Failed to create user"),
    })?;
    tracing::info!("Created user {}", user.username);

    Ok(ApiResponse::created(UserProfile::from(user)).with_message("User created"))
}

/// POST /users/login - Match on the exact (username, password, department) triple
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let users = state.repository::<User>()?;
    let Json(body) = body?;

    let (Some(username), Some(password), Some(department)) = (
        // Stored usernames are trimmed on create and update
        body.username.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
        body.password.filter(|v| !v.is_empty()),
        body.department.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::bad_request("username, password and department are required"));
    };

    let mut filter = Filter::new();
    filter.insert("username".to_string(), username);
    filter.insert("password".to_string(), password);
    filter.insert("department".to_string(), department);

    let user = users
        .select_one(&filter)
        .await
        .map_err(|e| ApiError::from(e).context("Login failed"))?
        .ok_or_else(|| ApiError::unauthorized("Incorrect username, password or department"))?;

    Ok(ApiResponse::success(UserProfile::from(user)).with_message("Login successful"))
}

/// GET /users - List all users
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<UserProfile>> {
    let users = state.repository::<User>()?;
    let all = users
        .select_any(&Filter::new())
        .await
        .map_err(|e| ApiError::from(e).context("Failed to list users"))?;
    Ok(ApiResponse::list(all.into_iter().map(UserProfile::from).collect()))
}

/// GET /users/:id - Fetch one user
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserProfile> {
    let users = state.repository::<User>()?;
    let id = parse_id(&id)?;

    let user = users
        .select_id(id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to fetch user"))?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok(ApiResponse::success(UserProfile::from(user)))
}

/// PUT /users/:id - Merge validated fields into a user
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let users = state.repository::<User>()?;
    let Json(body) = body?;
    let id = parse_id(&id)?;

    let patch = User::prepare_update(body)?;
    let user = users
        .update_id(id, patch)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to update user"))?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    Ok(ApiResponse::success(UserProfile::from(user)).with_message("User updated"))
}

/// DELETE /users/:id - Remove a user
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let users = state.repository::<User>()?;
    let id = parse_id(&id)?;

    users
        .delete_id(id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to delete user"))?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok(ApiResponse::message("User deleted"))
}
