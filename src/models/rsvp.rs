use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::id::{AccountId, EventId, NotificationId, RsvpId};

/// At most one exists per (event, user); the store enforces it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Rsvp {
    pub id: RsvpId,
    pub event_id: EventId,
    pub user_id: AccountId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Attendee {
    pub user_id: AccountId,
    pub display_name: String,
    pub rsvp_at: DateTime<Utc>,
}

/// Result of a committed RSVP: the row plus the owner notification written
/// in the same transaction, if one was due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RsvpReceipt {
    pub rsvp: Rsvp,
    pub notification: Option<NotificationId>,
}
