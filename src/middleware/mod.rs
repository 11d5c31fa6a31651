use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{Account, AccountId},
    AppState,
};

/// Header set by the upstream identity component once it has authenticated
/// the caller.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// An authenticated caller resolved against the account directory.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: AccountId,
    pub display_name: String,
}

/// Like [`Actor`], but anonymous requests are let through.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl MaybeActor {
    pub fn id(&self) -> Option<AccountId> {
        self.0.as_ref().map(|a| a.id)
    }
}

fn header_account_id(parts: &Parts) -> Result<Option<AccountId>, StatusCode> {
    let Some(value) = parts.headers.get(ACCOUNT_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .map(Some)
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn resolve(state: &AppState, id: AccountId) -> Result<Actor, StatusCode> {
    match state.accounts.find(id).await {
        Ok(Account { id, display_name, .. }) => Ok(Actor { id, display_name }),
        Err(AppError::NotFound(_)) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!("failed to resolve account {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let id = header_account_id(parts)?.ok_or(StatusCode::UNAUTHORIZED)?;
        resolve(state, id).await
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeActor {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match header_account_id(parts)? {
            Some(id) => Ok(MaybeActor(Some(resolve(state, id).await?))),
            None => Ok(MaybeActor(None)),
        }
    }
}
