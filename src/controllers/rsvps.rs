use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{Actor, MaybeActor},
    models::EventId,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/{id}/rsvp", post(create_rsvp).delete(withdraw_rsvp))
        .route("/events/{id}/rsvp/count", get(count_rsvps))
        .route("/events/{id}/rsvp/me", get(has_rsvp))
        .route("/events/{id}/attendees", get(list_attendees))
}

// POST /api/events/{id}/rsvp
async fn create_rsvp(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(event_id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.rsvps.create_rsvp(event_id, actor.id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// DELETE /api/events/{id}/rsvp
async fn withdraw_rsvp(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(event_id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    state.rsvps.withdraw_rsvp(event_id, actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/events/{id}/attendees
async fn list_attendees(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let attendees = state.rsvps.list_attendees(event_id).await?;
    Ok(Json(json!({
        "success": true,
        "count": attendees.len(),
        "attendees": attendees,
    })))
}

// GET /api/events/{id}/rsvp/count
async fn count_rsvps(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let count = state.rsvps.count_rsvps(event_id).await?;
    Ok(Json(json!({ "event_id": event_id, "count": count })))
}

// GET /api/events/{id}/rsvp/me
async fn has_rsvp(
    State(state): State<Arc<AppState>>,
    viewer: MaybeActor,
    Path(event_id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let has_rsvp = state.rsvps.has_rsvp(event_id, viewer.id()).await?;
    Ok(Json(json!({ "event_id": event_id, "has_rsvp": has_rsvp })))
}
