use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::state::AppState;
use crate::commands::incidents::{
    incident_create_db, incident_delete_db, incident_get_db, incident_post_update_db,
    incident_update_db, incidents_list_db,
};
use crate::error::Result;
use crate::notify::IncidentEvent;
use crate::types::{Incident, IncidentPatch, NewIncident, NewIncidentUpdate};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/incidents", get(list))
        .route("/api/incidents/{id}", get(get_by_id))
}

pub fn operator_router() -> Router<AppState> {
    Router::new()
        .route("/api/incidents", post(create))
        .route("/api/incidents/{id}", put(update).delete(delete))
        .route("/api/incidents/{id}/updates", post(post_update))
}

/// GET /api/incidents - newest first
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Incident>>> {
    let incidents = state.db(incidents_list_db).await?;
    Ok(Json(
        incidents.into_iter().map(Incident::without_operator).collect(),
    ))
}

/// GET /api/incidents/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Incident>> {
    let incident = state.db(move |pool| incident_get_db(pool, &id)).await?;
    Ok(Json(incident.without_operator()))
}

/// POST /api/incidents
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewIncident>,
) -> Result<(StatusCode, Json<Incident>)> {
    let incident = state
        .db(move |pool| incident_create_db(pool, &payload))
        .await?;
    state.notify(IncidentEvent::Created, &incident);
    Ok((StatusCode::CREATED, Json(incident)))
}

/// PUT /api/incidents/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<IncidentPatch>,
) -> Result<Json<Incident>> {
    let incident = state
        .db(move |pool| incident_update_db(pool, &id, &patch))
        .await?;
    state.notify(IncidentEvent::Updated, &incident);
    Ok(Json(incident))
}

/// POST /api/incidents/{id}/updates
pub async fn post_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<NewIncidentUpdate>,
) -> Result<(StatusCode, Json<Incident>)> {
    let incident = state
        .db(move |pool| incident_post_update_db(pool, &id, &update))
        .await?;
    state.notify(IncidentEvent::UpdatePosted, &incident);
    Ok((StatusCode::CREATED, Json(incident)))
}

/// DELETE /api/incidents/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.db(move |pool| incident_delete_db(pool, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
