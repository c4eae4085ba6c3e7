use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::state::AppState;
use crate::commands::subscriptions::{
    subscription_create_within_db, subscription_delete_db, subscription_update_db, subscriptions_list_db,
};
use crate::error::Result;
use crate::types::{NewSubscription, Subscription, SubscriptionPatch};

/// Anyone may subscribe; managing subscriptions is operator-only.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/subscriptions", post(create))
}

pub fn operator_router() -> Router<AppState> {
    Router::new()
        .route("/api/subscriptions", get(list))
        .route("/api/subscriptions/{id}", put(update).delete(delete))
}

/// GET /api/subscriptions
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Subscription>>> {
    Ok(Json(state.db(subscriptions_list_db).await?))
}

/// POST /api/subscriptions
///
/// Webhook targets must be public addresses, and sign-ups stop at the
/// configured subscription cap.
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewSubscription>,
) -> Result<(StatusCode, Json<Subscription>)> {
    payload.validate_public()?;
    let limit = state.config.max_subscriptions;
    let subscription = state
        .db(move |pool| subscription_create_within_db(pool, &payload, limit))
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// PUT /api/subscriptions/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<SubscriptionPatch>,
) -> Result<Json<Subscription>> {
    let subscription = state
        .db(move |pool| subscription_update_db(pool, &id, &patch))
        .await?;
    Ok(Json(subscription))
}

/// DELETE /api/subscriptions/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.db(move |pool| subscription_delete_db(pool, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
