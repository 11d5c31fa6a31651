use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::{
    accounts::AccountDirectory,
    weather::{Forecast, WeatherProvider},
};
use crate::{
    error::{AppError, AppResult},
    models::{AccountId, Event, EventFilter, EventId, EventInput},
    repository::{
        AccountRepository, EventRemoval, EventRepository, EventScope, Repositories, RsvpRepository,
    },
};

const CHANGE_DENIED: &str = "only the creator or an administrator may change this event";

/// Everything the detail view shows about one event.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub creator_name: Option<String>,
    pub rsvp_count: i64,
    pub viewer_has_rsvp: bool,
    pub viewer_is_creator: bool,
    pub weather: Option<Forecast>,
}

#[derive(Clone)]
pub struct EventCatalog {
    events: Arc<dyn EventRepository>,
    rsvps: Arc<dyn RsvpRepository>,
    accounts: Arc<dyn AccountRepository>,
    directory: AccountDirectory,
    weather: Arc<dyn WeatherProvider>,
}

impl EventCatalog {
    pub fn new(repos: &Repositories, weather: Arc<dyn WeatherProvider>) -> Self {
        Self {
            events: repos.events.clone(),
            rsvps: repos.rsvps.clone(),
            accounts: repos.accounts.clone(),
            directory: AccountDirectory::new(repos),
            weather,
        }
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create(&self, owner: AccountId, input: EventInput) -> AppResult<Event> {
        let draft = input.into_draft()?;
        let event = self.events.insert(owner, &draft).await?;
        info!("event {} created by {}", event.id, owner);
        Ok(event)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, event_id: EventId, actor: AccountId, input: EventInput) -> AppResult<Event> {
        let existing = self.find(event_id).await?;
        let scope = self.change_scope(&existing, actor).await?;

        let draft = input.into_draft()?;
        let Some(event) = self.events.update(event_id, &draft, scope).await? else {
            return Err(self.scope_lost(event_id).await);
        };
        info!("event {} updated by {}", event_id, actor);
        Ok(event)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, event_id: EventId, actor: AccountId) -> AppResult<EventRemoval> {
        let existing = self.find(event_id).await?;
        let scope = self.change_scope(&existing, actor).await?;

        let Some(removal) = self.events.delete(event_id, scope).await? else {
            return Err(self.scope_lost(event_id).await);
        };
        info!(
            "event {} deleted by {} ({} rsvps removed)",
            event_id, actor, removal.rsvps_removed
        );
        Ok(removal)
    }

    pub async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        self.events.list(filter).await
    }

    pub async fn find(&self, event_id: EventId) -> AppResult<Event> {
        self.events
            .find(event_id)
            .await?
            .ok_or_else(|| AppError::not_found("event"))
    }

    /// Newest start time first.
    pub async fn owned_by(&self, owner: AccountId) -> AppResult<Vec<Event>> {
        self.events.list_owned_by(owner).await
    }

    pub async fn details(&self, event_id: EventId, viewer: Option<AccountId>) -> AppResult<EventDetails> {
        let event = self.find(event_id).await?;

        let creator_name = match event.created_by {
            Some(creator) => self.accounts.find(creator).await?.map(|a| a.display_name),
            None => None,
        };
        let rsvp_count = self.rsvps.count_for_event(event_id).await?;
        let viewer_has_rsvp = match viewer {
            Some(viewer) => self.rsvps.exists(event_id, viewer).await?,
            None => false,
        };
        let viewer_is_creator = viewer.is_some() && viewer == event.created_by;
        let weather = self
            .weather
            .forecast(&event.location, event.starts_at.date_naive())
            .await;

        Ok(EventDetails {
            event,
            creator_name,
            rsvp_count,
            viewer_has_rsvp,
            viewer_is_creator,
            weather,
        })
    }

    /// Creator or administrator. An orphaned event is admin-only. A
    /// creator's write is scoped to rows they still own when it lands.
    async fn change_scope(&self, event: &Event, actor: AccountId) -> AppResult<EventScope> {
        if self.directory.is_admin(actor).await? {
            Ok(EventScope::Any)
        } else if event.created_by == Some(actor) {
            Ok(EventScope::OwnedBy(actor))
        } else {
            Err(AppError::forbidden(CHANGE_DENIED))
        }
    }

    /// The row was deleted or changed owner after `change_scope` ran.
    async fn scope_lost(&self, event_id: EventId) -> AppError {
        match self.events.find(event_id).await {
            Ok(Some(_)) => AppError::forbidden(CHANGE_DENIED),
            Ok(None) => AppError::not_found("event"),
            Err(err) => err,
        }
    }
}
