pub mod accounts;
pub mod admin;
pub mod events;
pub mod me;
pub mod rsvps;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(rsvps::routes())
        .merge(me::routes())
        .merge(accounts::routes())
        .merge(admin::routes())
}
