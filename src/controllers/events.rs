use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::{Actor, MaybeActor},
    models::{EventCategory, EventFilter, EventId, EventInput},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(event_details).put(update_event).delete(delete_event),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn day_start(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// The last representable instant of `date`, so `to` covers the whole day.
fn day_end(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_micro_opt(23, 59, 59, 999_999).map(|dt| dt.and_utc())
}

impl EventsQuery {
    pub fn into_filter(self) -> AppResult<EventFilter> {
        let mut filter = EventFilter::new();
        if let Some(q) = self.q {
            filter = filter.keyword(q);
        }
        if let Some(category) = self.category.filter(|c| !c.trim().is_empty()) {
            filter = filter.category(category.parse::<EventCategory>()?);
        }
        if let Some(from) = self.from.and_then(day_start) {
            filter = filter.starting_from(from);
        }
        if let Some(to) = self.to.and_then(day_end) {
            filter = filter.starting_until(to);
        }
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::invalid("'from' must not be after 'to'"));
            }
        }
        Ok(filter)
    }
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let events = state.catalog.list(&filter).await?;

    Ok(Json(json!({
        "success": true,
        "count": events.len(),
        "events": events,
    })))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(input): Json<EventInput>,
) -> AppResult<impl IntoResponse> {
    let event = state.catalog.create(actor.id, input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn event_details(
    State(state): State<Arc<AppState>>,
    viewer: MaybeActor,
    Path(id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let details = state.catalog.details(id, viewer.id()).await?;
    Ok(Json(details))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<EventId>,
    Json(input): Json<EventInput>,
) -> AppResult<impl IntoResponse> {
    let event = state.catalog.update(id, actor.id, input).await?;
    Ok(Json(event))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let removal = state.catalog.delete(id, actor.id).await?;
    Ok(Json(json!({ "success": true, "rsvps_removed": removal.rsvps_removed })))
}
