use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use super::state::AppState;
use crate::commands::components::{
    component_create_db, component_delete_db, component_get_db, component_set_status_db,
    component_set_visibility_db, component_update_db, components_list_db,
};
use crate::error::Result;
use crate::types::{Component, ComponentPatch, NewComponent, StatusType};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: StatusType,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityBody {
    pub visible: bool,
}

pub fn operator_router() -> Router<AppState> {
    Router::new()
        .route("/api/components", get(list).post(create))
        .route("/api/components/{id}", get(get_by_id).put(update).delete(delete))
        .route("/api/components/{id}/status", put(set_status))
        .route("/api/components/{id}/visibility", put(set_visibility))
}

/// GET /api/components
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Component>>> {
    Ok(Json(state.db(components_list_db).await?))
}

/// GET /api/components/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Component>> {
    Ok(Json(state.db(move |pool| component_get_db(pool, &id)).await?))
}

/// POST /api/components
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewComponent>,
) -> Result<(StatusCode, Json<Component>)> {
    let component = state
        .db(move |pool| component_create_db(pool, &payload))
        .await?;
    Ok((StatusCode::CREATED, Json(component)))
}

/// PUT /api/components/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ComponentPatch>,
) -> Result<Json<Component>> {
    let component = state
        .db(move |pool| component_update_db(pool, &id, &patch))
        .await?;
    Ok(Json(component))
}

/// PUT /api/components/{id}/status
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Component>> {
    let component = state
        .db(move |pool| component_set_status_db(pool, &id, body.status))
        .await?;
    Ok(Json(component))
}

/// PUT /api/components/{id}/visibility
pub async fn set_visibility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VisibilityBody>,
) -> Result<Json<Component>> {
    let component = state
        .db(move |pool| component_set_visibility_db(pool, &id, body.visible))
        .await?;
    Ok(Json(component))
}

/// DELETE /api/components/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.db(move |pool| component_delete_db(pool, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
