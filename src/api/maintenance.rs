use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::state::AppState;
use crate::commands::maintenance::{
    maintenance_create_db, maintenance_delete_db, maintenance_list_db, maintenance_update_db,
};
use crate::error::Result;
use crate::types::{Maintenance, MaintenancePatch, NewMaintenance};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/maintenance", get(list))
}

pub fn operator_router() -> Router<AppState> {
    Router::new()
        .route("/api/maintenance", post(create))
        .route("/api/maintenance/{id}", put(update).delete(delete))
}

/// GET /api/maintenance
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Maintenance>>> {
    let windows = state.db(maintenance_list_db).await?;
    Ok(Json(
        windows.into_iter().map(Maintenance::without_operator).collect(),
    ))
}

/// POST /api/maintenance
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewMaintenance>,
) -> Result<(StatusCode, Json<Maintenance>)> {
    let window = state
        .db(move |pool| maintenance_create_db(pool, &payload))
        .await?;
    Ok((StatusCode::CREATED, Json(window)))
}

/// PUT /api/maintenance/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<MaintenancePatch>,
) -> Result<Json<Maintenance>> {
    let window = state
        .db(move |pool| maintenance_update_db(pool, &id, &patch))
        .await?;
    Ok(Json(window))
}

/// DELETE /api/maintenance/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.db(move |pool| maintenance_delete_db(pool, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
