use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete as delete_route, get},
    Json, Router,
};

use super::state::AppState;
use crate::commands::metrics::{metric_create_db, metric_delete_db, metrics_list_db};
use crate::error::Result;
use crate::types::{Metric, MetricFilter, NewMetric};

pub fn operator_router() -> Router<AppState> {
    Router::new()
        .route("/api/metrics", get(list).post(create))
        .route("/api/metrics/{id}", delete_route(delete))
}

/// GET /api/metrics?componentId=..&limit=..
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<MetricFilter>,
) -> Result<Json<Vec<Metric>>> {
    Ok(Json(state.db(move |pool| metrics_list_db(pool, &filter)).await?))
}

/// POST /api/metrics
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewMetric>,
) -> Result<(StatusCode, Json<Metric>)> {
    let metric = state.db(move |pool| metric_create_db(pool, &payload)).await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

/// DELETE /api/metrics/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.db(move |pool| metric_delete_db(pool, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
