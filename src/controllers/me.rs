use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{error::AppResult, middleware::Actor, models::NotificationId, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me/events", get(my_events))
        .route("/me/rsvps", get(my_rsvps))
        .route("/me/stats", get(my_stats))
        .route("/me/notifications", get(list_notifications))
        .route("/me/notifications/unread", get(unread_count))
        .route("/me/notifications/read-all", post(mark_all_read))
        .route("/me/notifications/{id}/read", post(mark_read))
        .route("/me/notifications/{id}", axum::routing::delete(delete_notification))
}

#[derive(Debug, Deserialize)]
struct MailboxQuery {
    limit: Option<i64>,
}

async fn my_events(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    let events = state.catalog.owned_by(actor.id).await?;
    Ok(Json(json!({ "success": true, "events": events })))
}

async fn my_rsvps(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    let upcoming = state.rsvps.upcoming_for(actor.id).await?;
    let past = state.rsvps.past_for(actor.id).await?;
    Ok(Json(json!({ "success": true, "upcoming": upcoming, "past": past })))
}

async fn my_stats(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    Ok(Json(state.rsvps.stats_for(actor.id).await?))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(params): Query<MailboxQuery>,
) -> AppResult<impl IntoResponse> {
    let notifications = state.mailbox.list_for_recipient(actor.id, params.limit).await?;
    Ok(Json(json!({ "success": true, "notifications": notifications })))
}

async fn unread_count(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    let unread = state.mailbox.unread_count(actor.id).await?;
    Ok(Json(json!({ "unread": unread })))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<NotificationId>,
) -> AppResult<impl IntoResponse> {
    state.mailbox.mark_read(id, actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    let changed = state.mailbox.mark_all_read(actor.id).await?;
    Ok(Json(json!({ "success": true, "marked_read": changed })))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<NotificationId>,
) -> AppResult<impl IntoResponse> {
    state.mailbox.delete(id, actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
