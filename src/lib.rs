pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

use std::sync::Arc;

use repository::Repositories;
use services::{
    AccountDirectory, AdminReconciliation, EventCatalog, NotificationMailbox, RsvpEngine,
    WeatherProvider,
};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountDirectory,
    pub catalog: EventCatalog,
    pub rsvps: RsvpEngine,
    pub mailbox: NotificationMailbox,
    pub admin: AdminReconciliation,
}

impl AppState {
    pub fn new(repos: &Repositories, weather: Arc<dyn WeatherProvider>) -> Arc<Self> {
        Arc::new(Self {
            accounts: AccountDirectory::new(repos),
            catalog: EventCatalog::new(repos, weather),
            rsvps: RsvpEngine::new(repos),
            mailbox: NotificationMailbox::new(repos),
            admin: AdminReconciliation::new(repos),
        })
    }
}

/// The full HTTP application: banner, health check and the `/api` tree.
pub fn app(state: Arc<AppState>) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/", get(|| async { "Townsquare API v0.1" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
