use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{AccountId, Attendee, Event, EventCategory, EventId, RsvpReceipt},
    repository::{EventRepository, Repositories, RsvpRepository},
};

/// Activity summary for one account's profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub events_created: i64,
    pub rsvps_made: i64,
    /// RSVPs on events this account created.
    pub rsvps_received: i64,
    pub events_attended: i64,
    pub upcoming_events: i64,
    pub favourite_category: Option<EventCategory>,
    pub favourite_category_rsvps: i64,
}

#[derive(Clone)]
pub struct RsvpEngine {
    events: Arc<dyn EventRepository>,
    rsvps: Arc<dyn RsvpRepository>,
}

impl RsvpEngine {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            events: repos.events.clone(),
            rsvps: repos.rsvps.clone(),
        }
    }

    /// Records the RSVP and the owner notification as one unit. A duplicate
    /// pair is `AlreadyExists`, whether it was seen up front or raced in.
    #[tracing::instrument(skip(self))]
    pub async fn create_rsvp(&self, event_id: EventId, user_id: AccountId) -> AppResult<RsvpReceipt> {
        let receipt = self.rsvps.create(event_id, user_id).await?;
        info!(
            "rsvp {} recorded for event {} (notification: {:?})",
            receipt.rsvp.id, event_id, receipt.notification
        );
        Ok(receipt)
    }

    #[tracing::instrument(skip(self))]
    pub async fn withdraw_rsvp(&self, event_id: EventId, user_id: AccountId) -> AppResult<()> {
        if !self.rsvps.withdraw(event_id, user_id).await? {
            return Err(AppError::not_found("rsvp"));
        }
        info!("rsvp withdrawn for event {}", event_id);
        Ok(())
    }

    pub async fn list_attendees(&self, event_id: EventId) -> AppResult<Vec<Attendee>> {
        if self.events.find(event_id).await?.is_none() {
            return Err(AppError::not_found("event"));
        }
        self.rsvps.attendees(event_id).await
    }

    pub async fn count_rsvps(&self, event_id: EventId) -> AppResult<i64> {
        self.rsvps.count_for_event(event_id).await
    }

    /// Anonymous viewers have no RSVP.
    pub async fn has_rsvp(&self, event_id: EventId, user_id: Option<AccountId>) -> AppResult<bool> {
        match user_id {
            Some(user_id) => self.rsvps.exists(event_id, user_id).await,
            None => Ok(false),
        }
    }

    /// Events the account RSVP'd to that have not started yet, soonest first.
    pub async fn upcoming_for(&self, user_id: AccountId) -> AppResult<Vec<Event>> {
        let now = Utc::now();
        let mut events = self.rsvps.events_for(user_id).await?;
        events.retain(|e| e.starts_at >= now);
        Ok(events)
    }

    /// Events the account RSVP'd to that already started, most recent first.
    pub async fn past_for(&self, user_id: AccountId) -> AppResult<Vec<Event>> {
        let now = Utc::now();
        let mut events = self.rsvps.events_for(user_id).await?;
        events.retain(|e| e.starts_at < now);
        events.reverse();
        Ok(events)
    }

    pub async fn stats_for(&self, user_id: AccountId) -> AppResult<ProfileStats> {
        let (events_created, rsvps_made, rsvps_received, attendance, favourite) = futures::try_join!(
            self.events.count_owned_by(user_id),
            self.rsvps.count_by_user(user_id),
            self.rsvps.count_received_by(user_id),
            self.rsvps.count_attendance(user_id, Utc::now()),
            self.rsvps.favourite_category(user_id),
        )?;
        let (events_attended, upcoming_events) = attendance;
        Ok(ProfileStats {
            events_created,
            rsvps_made,
            rsvps_received,
            events_attended,
            upcoming_events,
            favourite_category: favourite.map(|(category, _)| category),
            favourite_category_rsvps: favourite.map_or(0, |(_, n)| n),
        })
    }
}
