use axum::{
    extract::State,
    http::header::CACHE_CONTROL,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use super::state::AppState;
use crate::commands::overview::{overview_db, PublicOverview};
use crate::error::Result;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/overview", get(overview))
}

pub fn operator_router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}

/// GET /api/overview - visible components only
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let methods = state.config.methods_component.clone();
    let overview = state.db(move |pool| overview_db(pool, &methods, true)).await?;
    let max_age = state.config.poll_interval.as_secs();
    Ok((
        [(CACHE_CONTROL, format!("public, max-age={max_age}"))],
        Json(overview),
    ))
}

/// GET /api/dashboard - every component, hidden ones included
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<PublicOverview>> {
    let methods = state.config.methods_component.clone();
    let overview = state.db(move |pool| overview_db(pool, &methods, false)).await?;
    Ok(Json(overview))
}
