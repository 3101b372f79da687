// Demo entity routes: a quick way to prove the store accepts reads and writes.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};

use crate::app::AppState;
use crate::database::models::test_entry::NewTestEntry;
use crate::database::models::TestEntry;
use crate::database::Filter;
use crate::middleware::{ApiResponse, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/test", get(write_sample))
        .route("/data", get(list).post(create).delete(delete_all))
}

/// GET /test - Write the fixed sample record
pub async fn write_sample(State(state): State<AppState>) -> ApiResult<TestEntry> {
    let entries = state.repository::<TestEntry>()?;
    let entry = entries.create(&TestEntry::sample()).await?;
    Ok(ApiResponse::success(entry).with_message("Test record created"))
}

/// GET /data - List every test record
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<TestEntry>> {
    let entries = state.repository::<TestEntry>()?;
    Ok(ApiResponse::list(entries.select_any(&Filter::new()).await?))
}

/// POST /data - Create a record; `name` and `message` are required
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewTestEntry>, JsonRejection>,
) -> ApiResult<TestEntry> {
    let entries = state.repository::<TestEntry>()?;
    let Json(body) = body?;

    let entry = entries.create(&body.into_entry()?).await?;
    Ok(ApiResponse::created(entry).with_message("Record created"))
}

/// DELETE /data - Remove every test record
pub async fn delete_all(State(state): State<AppState>) -> ApiResult<()> {
    let entries = state.repository::<TestEntry>()?;
    let deleted = entries.delete_all().await?;
    tracing::info!("Deleted {} test records", deleted);
    Ok(ApiResponse::message(format!("Deleted {} test records", deleted)))
}
