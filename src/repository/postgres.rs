use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::debug;

use super::{
    AccountRemoval, AccountRepository, EventRemoval, EventRepository, EventScope,
    NotificationRepository, RsvpRepository,
};
use crate::{
    database::{retry_transient, Database},
    error::{AppError, AppResult},
    models::{
        account::Registration, Account, AccountId, AccountSummary, Attendee, Event,
        EventCategory, EventDraft, EventFilter, EventId, NewNotification, Notification,
        NotificationId, NotificationWithEvent, Role, Rsvp, RsvpReceipt,
    },
};

macro_rules! select_events {
    ($rest:literal) => {
        concat!(
            "SELECT id, title, description, starts_at, location, category, created_by FROM events ",
            $rest
        )
    };
}

const DUPLICATE_RSVP: &str = "you have already RSVP'd to this event";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Escapes LIKE metacharacters so user text is matched literally.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Renders an [`EventFilter`] as a parameterized query.
pub(crate) fn list_events_query(filter: &EventFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(select_events!("WHERE TRUE"));

    if let Some(keyword) = &filter.keyword {
        let pattern = like_pattern(keyword);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(from) = filter.from {
        qb.push(" AND starts_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND starts_at <= ").push_bind(to);
    }
    qb.push(" ORDER BY starts_at ASC, id ASC");
    qb
}

fn push_scope(qb: &mut QueryBuilder<'static, Postgres>, scope: EventScope) {
    match scope {
        EventScope::Any => {}
        EventScope::OwnedBy(owner) => {
            qb.push(" AND created_by = ").push_bind(owner);
        }
        EventScope::Orphaned => {
            qb.push(" AND created_by IS NULL");
        }
    }
}

/// Row lock taken before an event is deleted.
pub(crate) fn lock_event_query(id: EventId, scope: EventScope) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT id FROM events WHERE id = ");
    qb.push_bind(id);
    push_scope(&mut qb, scope);
    qb.push(" FOR UPDATE");
    qb
}

pub(crate) fn update_event_query(
    id: EventId,
    draft: &EventDraft,
    scope: EventScope,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE events SET title = ");
    qb.push_bind(draft.title.clone())
        .push(", description = ")
        .push_bind(draft.description.clone())
        .push(", starts_at = ")
        .push_bind(draft.starts_at)
        .push(", location = ")
        .push_bind(draft.location.clone())
        .push(", category = ")
        .push_bind(draft.category)
        .push(" WHERE id = ")
        .push_bind(id);
    push_scope(&mut qb, scope);
    qb.push(" RETURNING id, title, description, starts_at, location, category, created_by");
    qb
}

#[derive(FromRow)]
struct EventWithRsvps {
    #[sqlx(flatten)]
    event: Event,
    rsvps: i64,
}

#[derive(FromRow)]
struct AccountWithRoles {
    #[sqlx(flatten)]
    account: Account,
    roles: Vec<String>,
}

fn parse_roles(names: Vec<String>) -> Vec<Role> {
    names.iter().filter_map(|name| name.parse().ok()).collect()
}

pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn create_account_tx(&self, registration: &Registration, roles: &[Role]) -> AppResult<Account> {
        let mut tx = self.db.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, display_name, email)
             VALUES ($1, $2, $3)
             RETURNING id, display_name, email, created_at",
        )
        .bind(AccountId::new())
        .bind(&registration.display_name)
        .bind(&registration.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists(format!(
                    "an account with email {} already exists",
                    registration.email
                ))
            } else {
                e.into()
            }
        })?;

        for role in roles {
            sqlx::query(
                "INSERT INTO account_roles (account_id, role_name) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(account.id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(account)
    }

    async fn delete_account_tx(&self, id: AccountId) -> AppResult<Option<AccountRemoval>> {
        let mut tx = self.db.pool.begin().await?;

        let found = sqlx::query_scalar::<_, AccountId>("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Ok(None);
        }

        // 1) Orphan the account's events
        let orphaned_events = sqlx::query("UPDATE events SET created_by = NULL WHERE created_by = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // 2) Drop its RSVPs
        let rsvps_removed = sqlx::query("DELETE FROM rsvps WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // 3) Drop notifications addressed to it
        let notifications_removed = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // 4) The account itself; role memberships cascade
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(AccountRemoval {
            orphaned_events,
            rsvps_removed,
            notifications_removed,
        }))
    }

    /// Deletes an event and its RSVPs. The row must match `scope` when the
    /// lock is taken.
    async fn delete_event_tx(&self, id: EventId, scope: EventScope) -> AppResult<Option<EventRemoval>> {
        let mut tx = self.db.pool.begin().await?;

        let found = lock_event_query(id, scope)
            .build_query_scalar::<EventId>()
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Ok(None);
        }

        let rsvps_removed = sqlx::query("DELETE FROM rsvps WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // notifications.event_id is nulled by the foreign key
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(EventRemoval { rsvps_removed }))
    }

    async fn reassign_tx(&self, id: EventId, new_owner: AccountId) -> AppResult<Option<Event>> {
        let mut tx = self.db.pool.begin().await?;

        let owner = sqlx::query_scalar::<_, AccountId>("SELECT id FROM accounts WHERE id = $1 FOR SHARE")
            .bind(new_owner)
            .fetch_optional(&mut *tx)
            .await?;
        if owner.is_none() {
            return Ok(None);
        }

        let event = sqlx::query_as::<_, Event>(
            "UPDATE events SET created_by = $2
             WHERE id = $1 AND created_by IS NULL
             RETURNING id, title, description, starts_at, location, category, created_by",
        )
        .bind(id)
        .bind(new_owner)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn create_rsvp_tx(&self, event_id: EventId, user_id: AccountId) -> AppResult<RsvpReceipt> {
        let mut tx = self.db.pool.begin().await?;

        // FOR SHARE pins the current owner until commit.
        let event = sqlx::query_as::<_, Event>(select_events!("WHERE id = $1 FOR SHARE"))
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("event"))?;

        let attendee_name = sqlx::query_scalar::<_, String>(
            "SELECT display_name FROM accounts WHERE id = $1 FOR SHARE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("account"))?;

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM rsvps WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(AppError::AlreadyExists(DUPLICATE_RSVP.into()));
        }

        // A concurrent insert for the same pair can still win the race
        // between the check and here; the unique constraint decides.
        let rsvp = sqlx::query_as::<_, Rsvp>(
            "INSERT INTO rsvps (event_id, user_id) VALUES ($1, $2)
             RETURNING id, event_id, user_id, created_at",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists(DUPLICATE_RSVP.into())
            } else {
                e.into()
            }
        })?;

        let notification = match NewNotification::for_rsvp(&event, user_id, Some(&attendee_name)) {
            Some(notice) => Some(
                sqlx::query_scalar::<_, NotificationId>(
                    "INSERT INTO notifications (recipient_id, event_id, message)
                     VALUES ($1, $2, $3)
                     RETURNING id",
                )
                .bind(notice.recipient_id)
                .bind(notice.event_id)
                .bind(&notice.message)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;
        Ok(RsvpReceipt { rsvp, notification })
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create(&self, registration: &Registration, roles: &[Role]) -> AppResult<Account> {
        retry_transient("create_account", || self.create_account_tx(registration, roles)).await
    }

    async fn find(&self, id: AccountId) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, display_name, email, created_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, display_name, email, created_at FROM accounts WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(account)
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<AccountSummary>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, AccountWithRoles>(
            r#"
            SELECT a.id, a.display_name, a.email, a.created_at,
                   COALESCE(
                       array_agg(ar.role_name::text ORDER BY ar.role_name)
                           FILTER (WHERE ar.role_name IS NOT NULL),
                       '{}'::text[]
                   ) AS roles
            FROM accounts a
            LEFT JOIN account_roles ar ON ar.account_id = a.id
            WHERE $1::text IS NULL OR a.display_name ILIKE $1 OR a.email ILIKE $1
            GROUP BY a.id
            ORDER BY a.display_name
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AccountSummary {
                account: row.account,
                roles: parse_roles(row.roles),
            })
            .collect())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.db.pool)
            .await?)
    }

    async fn roles_of(&self, id: AccountId) -> AppResult<Vec<Role>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT role_name::text FROM account_roles WHERE account_id = $1 ORDER BY role_name",
        )
        .bind(id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(parse_roles(names))
    }

    async fn ensure_role(&self, role: Role) -> AppResult<()> {
        sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(role.as_str())
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn grant_role(&self, id: AccountId, role: Role) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO account_roles (account_id, role_name) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(role.as_str())
        .execute(&self.db.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::not_found("account")
            } else {
                e.into()
            }
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_role(&self, id: AccountId, role: Role) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM account_roles WHERE account_id = $1 AND role_name = $2")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cascade(&self, id: AccountId) -> AppResult<Option<AccountRemoval>> {
        retry_transient("delete_account", || self.delete_account_tx(id)).await
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn insert(&self, owner: AccountId, draft: &EventDraft) -> AppResult<Event> {
        sqlx::query_as::<_, Event>(
            "INSERT INTO events (title, description, starts_at, location, category, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, title, description, starts_at, location, category, created_by",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.starts_at)
        .bind(&draft.location)
        .bind(draft.category)
        .bind(owner)
        .fetch_one(&self.db.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::not_found("account")
            } else {
                e.into()
            }
        })
    }

    async fn insert_unowned(&self, draft: &EventDraft) -> AppResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events (title, description, starts_at, location, category)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, title, description, starts_at, location, category, created_by",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.starts_at)
        .bind(&draft.location)
        .bind(draft.category)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(event)
    }

    async fn find(&self, id: EventId) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(select_events!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(event)
    }

    async fn update(&self, id: EventId, draft: &EventDraft, scope: EventScope) -> AppResult<Option<Event>> {
        // Single statement: the scope and the write see the same row version.
        let event = update_event_query(id, draft, scope)
            .build_query_as::<Event>()
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(event)
    }

    async fn delete(&self, id: EventId, scope: EventScope) -> AppResult<Option<EventRemoval>> {
        retry_transient("delete_event", || self.delete_event_tx(id, scope)).await
    }

    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let mut qb = list_events_query(filter);
        debug!("listing events: {}", qb.sql());
        let events = qb
            .build_query_as::<Event>()
            .fetch_all(&self.db.pool)
            .await?;
        Ok(events)
    }

    async fn list_owned_by(&self, owner: AccountId) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(select_events!(
            "WHERE created_by = $1 ORDER BY starts_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(events)
    }

    async fn list_orphaned(&self) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(select_events!(
            "WHERE created_by IS NULL ORDER BY starts_at DESC, id DESC"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(events)
    }

    async fn reassign_orphaned(&self, id: EventId, new_owner: AccountId) -> AppResult<Option<Event>> {
        retry_transient("reassign_event", || self.reassign_tx(id, new_owner)).await
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.db.pool)
            .await?)
    }

    async fn count_orphaned(&self) -> AppResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE created_by IS NULL")
                .fetch_one(&self.db.pool)
                .await?,
        )
    }

    async fn count_owned_by(&self, owner: AccountId) -> AppResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE created_by = $1")
                .bind(owner)
                .fetch_one(&self.db.pool)
                .await?,
        )
    }

    async fn count_upcoming_and_past(&self, now: DateTime<Utc>) -> AppResult<(i64, i64)> {
        Ok(sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*) FILTER (WHERE starts_at >= $1),
                    COUNT(*) FILTER (WHERE starts_at < $1)
             FROM events",
        )
        .bind(now)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn count_by_category(&self) -> AppResult<Vec<(EventCategory, i64)>> {
        let counts = sqlx::query_as::<_, (EventCategory, i64)>(
            "SELECT category, COUNT(*) AS n FROM events
             GROUP BY category
             ORDER BY n DESC, category::text ASC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(counts)
    }

    async fn most_popular(&self) -> AppResult<Option<(Event, i64)>> {
        let top = sqlx::query_as::<_, EventWithRsvps>(
            "SELECT e.id, e.title, e.description, e.starts_at, e.location, e.category, e.created_by,
                    COUNT(r.id) AS rsvps
             FROM events e
             LEFT JOIN rsvps r ON r.event_id = e.id
             GROUP BY e.id
             ORDER BY rsvps DESC, e.id ASC
             LIMIT 1",
        )
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(top.map(|row| (row.event, row.rsvps)))
    }
}

#[async_trait]
impl RsvpRepository for PgStore {
    async fn create(&self, event_id: EventId, user_id: AccountId) -> AppResult<RsvpReceipt> {
        retry_transient("create_rsvp", || self.create_rsvp_tx(event_id, user_id)).await
    }

    async fn withdraw(&self, event_id: EventId, user_id: AccountId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM rsvps WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn attendees(&self, event_id: EventId) -> AppResult<Vec<Attendee>> {
        let attendees = sqlx::query_as::<_, Attendee>(
            "SELECT a.id AS user_id, a.display_name, r.created_at AS rsvp_at
             FROM rsvps r
             JOIN accounts a ON a.id = r.user_id
             WHERE r.event_id = $1
             ORDER BY r.created_at ASC, r.id ASC",
        )
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(attendees)
    }

    async fn count_for_event(&self, event_id: EventId) -> AppResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rsvps WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.db.pool)
                .await?,
        )
    }

    async fn exists(&self, event_id: EventId, user_id: AccountId) -> AppResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM rsvps WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn events_for(&self, user_id: AccountId) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT e.id, e.title, e.description, e.starts_at, e.location, e.category, e.created_by
             FROM rsvps r
             JOIN events e ON e.id = r.event_id
             WHERE r.user_id = $1
             ORDER BY e.starts_at ASC, e.id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(events)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rsvps")
            .fetch_one(&self.db.pool)
            .await?)
    }

    async fn count_by_user(&self, user_id: AccountId) -> AppResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rsvps WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db.pool)
                .await?,
        )
    }

    async fn count_received_by(&self, owner: AccountId) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rsvps r
             JOIN events e ON e.id = r.event_id
             WHERE e.created_by = $1",
        )
        .bind(owner)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn count_attendance(&self, user_id: AccountId, now: DateTime<Utc>) -> AppResult<(i64, i64)> {
        Ok(sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*) FILTER (WHERE e.starts_at < $2),
                    COUNT(*) FILTER (WHERE e.starts_at >= $2)
             FROM rsvps r
             JOIN events e ON e.id = r.event_id
             WHERE r.user_id = $1",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.db.pool)
        .await?)
    }

    async fn favourite_category(&self, user_id: AccountId) -> AppResult<Option<(EventCategory, i64)>> {
        Ok(sqlx::query_as::<_, (EventCategory, i64)>(
            "SELECT e.category, COUNT(*) AS n
             FROM rsvps r
             JOIN events e ON e.id = r.event_id
             WHERE r.user_id = $1
             GROUP BY e.category
             ORDER BY n DESC, e.category::text ASC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await?)
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn recent_for(&self, recipient: AccountId, limit: i64) -> AppResult<Vec<NotificationWithEvent>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, recipient_id, event_id, message, is_read, created_at
             FROM notifications
             WHERE recipient_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(recipient)
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;

        let mut event_ids: Vec<i64> = notifications
            .iter()
            .filter_map(|n| n.event_id.map(|id| id.0))
            .collect();
        event_ids.sort_unstable();
        event_ids.dedup();

        let events: HashMap<EventId, Event> = if event_ids.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, Event>(select_events!("WHERE id = ANY($1)"))
                .bind(&event_ids)
                .fetch_all(&self.db.pool)
                .await?
                .into_iter()
                .map(|e| (e.id, e))
                .collect()
        };

        Ok(notifications
            .into_iter()
            .map(|notification| {
                let event = notification.event_id.and_then(|id| events.get(&id).cloned());
                NotificationWithEvent {
                    notification,
                    event,
                }
            })
            .collect())
    }

    async fn mark_read(&self, id: NotificationId, recipient: AccountId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient)
        .execute(&self.db.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient: AccountId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient)
        .execute(&self.db.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: NotificationId, recipient: AccountId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unread_count(&self, recipient: AccountId) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient)
        .fetch_one(&self.db.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_filter_lists_everything_by_start_time() {
        let qb = list_events_query(&EventFilter::new());
        assert_eq!(
            qb.sql(),
            "SELECT id, title, description, starts_at, location, category, created_by FROM events \
             WHERE TRUE ORDER BY starts_at ASC, id ASC"
        );
    }

    #[test]
    fn every_filter_option_becomes_a_bound_predicate() {
        let filter = EventFilter::new()
            .keyword("jazz")
            .category(EventCategory::Concert)
            .starting_from(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
            .starting_until(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap());
        let qb = list_events_query(&filter);
        let sql = qb.sql();

        assert!(sql.contains("(title ILIKE $1 OR description ILIKE $2 OR location ILIKE $3)"));
        assert!(sql.contains("AND category = $4"));
        assert!(sql.contains("AND starts_at >= $5"));
        assert!(sql.contains("AND starts_at <= $6"));
        assert!(!sql.contains("jazz"));
    }

    #[test]
    fn owner_scope_is_part_of_the_write() {
        let draft = EventDraft {
            title: "Jam".into(),
            description: "Bring instruments".into(),
            starts_at: Utc.with_ymd_and_hms(2026, 5, 1, 19, 0, 0).unwrap(),
            location: "Borås".into(),
            category: EventCategory::Concert,
        };
        let owner = AccountId::new();

        let update = update_event_query(EventId(7), &draft, EventScope::OwnedBy(owner));
        assert!(update.sql().contains("WHERE id = $6 AND created_by = $7 RETURNING"));

        let any = update_event_query(EventId(7), &draft, EventScope::Any);
        assert!(any.sql().contains("WHERE id = $6 RETURNING"));

        let lock = lock_event_query(EventId(7), EventScope::Orphaned);
        assert_eq!(
            lock.sql(),
            "SELECT id FROM events WHERE id = $1 AND created_by IS NULL FOR UPDATE"
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
