use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::Actor,
    models::{AccountId, EventId},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/overview", get(overview))
        .route("/admin/categories", get(categories))
        .route("/admin/statistics", get(statistics))
        .route("/admin/accounts", get(list_accounts))
        .route("/admin/accounts/{id}", get(account_details).delete(delete_account))
        .route(
            "/admin/accounts/{id}/roles/{role}",
            post(grant_role).delete(revoke_role),
        )
        .route("/admin/orphaned-events", get(orphaned_events))
        .route("/admin/orphaned-events/{id}", delete(delete_orphaned_event))
        .route("/admin/orphaned-events/{id}/reassign", post(reassign_event))
}

#[derive(Debug, Deserialize)]
struct AccountSearch {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReassignRequest {
    new_owner: AccountId,
}

async fn overview(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    Ok(Json(state.admin.overview(actor.id).await?))
}

async fn categories(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    let breakdown = state.admin.category_breakdown(actor.id).await?;
    Ok(Json(json!({ "success": true, "categories": breakdown })))
}

async fn statistics(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    Ok(Json(state.admin.event_statistics(actor.id).await?))
}

async fn account_details(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<AccountId>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.admin.account_details(id, actor.id).await?))
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(params): Query<AccountSearch>,
) -> AppResult<impl IntoResponse> {
    let accounts = state.admin.list_accounts(params.q.as_deref(), actor.id).await?;
    Ok(Json(json!({ "success": true, "accounts": accounts })))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<AccountId>,
) -> AppResult<impl IntoResponse> {
    let removal = state.admin.delete_account(id, actor.id).await?;
    Ok(Json(json!({ "success": true, "removed": removal })))
}

async fn grant_role(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((id, role)): Path<(AccountId, String)>,
) -> AppResult<impl IntoResponse> {
    let added = state.admin.grant_role(id, &role, actor.id).await?;
    Ok(Json(json!({ "success": true, "changed": added })))
}

async fn revoke_role(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((id, role)): Path<(AccountId, String)>,
) -> AppResult<impl IntoResponse> {
    let removed = state.admin.revoke_role(id, &role, actor.id).await?;
    Ok(Json(json!({ "success": true, "changed": removed })))
}

async fn orphaned_events(State(state): State<Arc<AppState>>, actor: Actor) -> AppResult<impl IntoResponse> {
    let events = state.admin.list_orphaned_events(actor.id).await?;
    Ok(Json(json!({ "success": true, "count": events.len(), "events": events })))
}

async fn delete_orphaned_event(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<EventId>,
) -> AppResult<impl IntoResponse> {
    let removal = state.admin.delete_orphaned_event(id, actor.id).await?;
    Ok(Json(json!({ "success": true, "rsvps_removed": removal.rsvps_removed })))
}

async fn reassign_event(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<EventId>,
    Json(req): Json<ReassignRequest>,
) -> AppResult<impl IntoResponse> {
    let event = state.admin.reassign_event(id, req.new_owner, actor.id).await?;
    Ok(Json(event))
}
