use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{
    event::Event,
    id::{AccountId, EventId, NotificationId},
};

pub const MESSAGE_MAX_CHARS: usize = 240;

/// `event_id` becomes `None` if the source event is later deleted; the message
/// text is self-contained.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: AccountId,
    pub event_id: Option<EventId>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationWithEvent {
    #[serde(flatten)]
    pub notification: Notification,
    pub event: Option<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: AccountId,
    pub event_id: EventId,
    pub message: String,
}

impl NewNotification {
    /// The owner notice owed for an RSVP on `event` by `attendee`. Nothing is
    /// owed for orphaned events or when owners RSVP to their own event.
    pub fn for_rsvp(event: &Event, attendee: AccountId, attendee_name: Option<&str>) -> Option<Self> {
        let owner = event.created_by?;
        if owner == attendee {
            return None;
        }

        let who = attendee_name.unwrap_or("Someone");
        let message: String = format!("{who} has RSVP'd to your event '{}'", event.title)
            .chars()
            .take(MESSAGE_MAX_CHARS)
            .collect();

        Some(Self {
            recipient_id: owner,
            event_id: event.id,
            message,
        })
    }
}
