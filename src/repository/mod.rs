//! Storage seams for the consistency engine.
//!
//! Each trait method that touches more than one row is a single atomic unit:
//! one transaction in [`postgres`], one critical section in [`memory`].
//! Both implementations enforce the same schema rules: one RSVP per
//! (event, user), events orphaned rather than deleted with their creator,
//! RSVPs and received notifications removed with their account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    database::Database,
    error::AppResult,
    models::{
        account::Registration, Account, AccountId, AccountSummary, Attendee, Event,
        EventCategory, EventDraft, EventFilter, EventId, NotificationId, NotificationWithEvent,
        Role, RsvpReceipt,
    },
};

pub mod memory;
pub mod postgres;

/// Upper bound on a single mailbox page.
pub const MAILBOX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountRemoval {
    pub orphaned_events: u64,
    pub rsvps_removed: u64,
    pub notifications_removed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventRemoval {
    pub rsvps_removed: u64,
}

/// Row condition an event mutation must still meet when it is applied.
/// Checked in the same statement or critical section as the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Any,
    OwnedBy(AccountId),
    Orphaned,
}

impl EventScope {
    pub fn admits(&self, event: &Event) -> bool {
        match self {
            EventScope::Any => true,
            EventScope::OwnedBy(owner) => event.created_by == Some(*owner),
            EventScope::Orphaned => event.is_orphaned(),
        }
    }
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the email is taken.
    async fn create(&self, registration: &Registration, roles: &[Role]) -> AppResult<Account>;
    async fn find(&self, id: AccountId) -> AppResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn list(&self, search: Option<&str>) -> AppResult<Vec<AccountSummary>>;
    async fn count(&self) -> AppResult<i64>;

    async fn roles_of(&self, id: AccountId) -> AppResult<Vec<Role>>;
    async fn ensure_role(&self, role: Role) -> AppResult<()>;
    /// Returns whether the membership was newly added.
    async fn grant_role(&self, id: AccountId, role: Role) -> AppResult<bool>;
    /// Returns whether a membership was removed.
    async fn revoke_role(&self, id: AccountId, role: Role) -> AppResult<bool>;

    /// Orphans the account's events, drops its RSVPs and received
    /// notifications, then the account. `None` if the account is absent.
    async fn delete_cascade(&self, id: AccountId) -> AppResult<Option<AccountRemoval>>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, owner: AccountId, draft: &EventDraft) -> AppResult<Event>;
    /// Seed-only path for events that start without an owner.
    async fn insert_unowned(&self, draft: &EventDraft) -> AppResult<Event>;
    async fn find(&self, id: EventId) -> AppResult<Option<Event>>;
    /// Replaces the editable fields; `created_by` is untouched. `None` if
    /// the event is missing or outside `scope`.
    async fn update(&self, id: EventId, draft: &EventDraft, scope: EventScope) -> AppResult<Option<Event>>;
    /// Removes the event and its RSVPs. Notifications keep their text.
    /// `None` if the event is missing or outside `scope` at commit time.
    async fn delete(&self, id: EventId, scope: EventScope) -> AppResult<Option<EventRemoval>>;
    /// Ordered by start time ascending.
    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>>;
    /// Newest start time first.
    async fn list_owned_by(&self, owner: AccountId) -> AppResult<Vec<Event>>;
    /// Newest start time first.
    async fn list_orphaned(&self) -> AppResult<Vec<Event>>;
    /// Claims an orphaned event for an existing account. `None` if the event
    /// is missing, already owned, or the account does not exist.
    async fn reassign_orphaned(&self, id: EventId, new_owner: AccountId) -> AppResult<Option<Event>>;
    async fn count(&self) -> AppResult<i64>;
    async fn count_orphaned(&self) -> AppResult<i64>;
    async fn count_owned_by(&self, owner: AccountId) -> AppResult<i64>;
    /// `(upcoming, past)`, split at `now`.
    async fn count_upcoming_and_past(&self, now: DateTime<Utc>) -> AppResult<(i64, i64)>;
    /// Most frequent category first.
    async fn count_by_category(&self) -> AppResult<Vec<(EventCategory, i64)>>;
    /// The event with the most RSVPs and that count; ties go to the lowest id.
    async fn most_popular(&self) -> AppResult<Option<(Event, i64)>>;
}

#[async_trait]
pub trait RsvpRepository: Send + Sync {
    /// Inserts the RSVP and, in the same transaction, the owner notification
    /// from [`crate::models::NewNotification::for_rsvp`]. Fails with
    /// `NotFound` for a missing event or account and `AlreadyExists` for a
    /// duplicate pair, including one detected by the unique constraint.
    async fn create(&self, event_id: EventId, user_id: AccountId) -> AppResult<RsvpReceipt>;
    /// Returns whether a row was removed.
    async fn withdraw(&self, event_id: EventId, user_id: AccountId) -> AppResult<bool>;
    /// First come, first served.
    async fn attendees(&self, event_id: EventId) -> AppResult<Vec<Attendee>>;
    async fn count_for_event(&self, event_id: EventId) -> AppResult<i64>;
    async fn exists(&self, event_id: EventId, user_id: AccountId) -> AppResult<bool>;
    /// Events the account has RSVP'd to, by start time ascending.
    async fn events_for(&self, user_id: AccountId) -> AppResult<Vec<Event>>;
    async fn count(&self) -> AppResult<i64>;
    async fn count_by_user(&self, user_id: AccountId) -> AppResult<i64>;
    /// RSVPs on events `owner` created, the owner's own included.
    async fn count_received_by(&self, owner: AccountId) -> AppResult<i64>;
    /// `(attended, upcoming)`: the account's RSVPs on events before and from `now`.
    async fn count_attendance(&self, user_id: AccountId, now: DateTime<Utc>) -> AppResult<(i64, i64)>;
    /// Category the account RSVPs to most, with that count. Ties go to the
    /// alphabetically first category.
    async fn favourite_category(&self, user_id: AccountId) -> AppResult<Option<(EventCategory, i64)>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Newest first, at most `limit` rows.
    async fn recent_for(&self, recipient: AccountId, limit: i64) -> AppResult<Vec<NotificationWithEvent>>;
    /// `false` when no notification with that id belongs to `recipient`.
    async fn mark_read(&self, id: NotificationId, recipient: AccountId) -> AppResult<bool>;
    /// Number of rows that flipped from unread to read.
    async fn mark_all_read(&self, recipient: AccountId) -> AppResult<u64>;
    async fn delete(&self, id: NotificationId, recipient: AccountId) -> AppResult<bool>;
    async fn unread_count(&self, recipient: AccountId) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub events: Arc<dyn EventRepository>,
    pub rsvps: Arc<dyn RsvpRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn postgres(db: &Database) -> Self {
        let store = Arc::new(postgres::PgStore::new(db.clone()));
        Self {
            accounts: store.clone(),
            events: store.clone(),
            rsvps: store.clone(),
            notifications: store,
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            accounts: store.clone(),
            events: store.clone(),
            rsvps: store.clone(),
            notifications: store,
        }
    }
}
