use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::AppResult, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/accounts", post(register))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegisterRequest {
    display_name: String,
    email: String,
}

// POST /api/accounts
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let account = state.accounts.register(&req.display_name, &req.email).await?;
    Ok((StatusCode::CREATED, Json(account)))
}
