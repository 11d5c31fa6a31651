//! In-process store used by the test suite and by `STORAGE=memory` runs.
//!
//! All tables sit behind one mutex, so every trait method is atomic with
//! respect to every other. The lock is never held across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use super::{
    AccountRemoval, AccountRepository, EventRemoval, EventRepository, EventScope,
    NotificationRepository, RsvpRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        account::Registration, Account, AccountId, AccountSummary, Attendee, Event,
        EventCategory, EventDraft, EventFilter, EventId, NewNotification, Notification,
        NotificationId, NotificationWithEvent, Role, Rsvp, RsvpId, RsvpReceipt,
    },
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    roles: BTreeSet<Role>,
    memberships: HashMap<AccountId, BTreeSet<Role>>,
    events: BTreeMap<EventId, Event>,
    rsvps: BTreeMap<RsvpId, Rsvp>,
    rsvp_pairs: HashSet<(EventId, AccountId)>,
    notifications: BTreeMap<NotificationId, Notification>,
    next_id: i64,
    last_tick: Option<DateTime<Utc>>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps, so creation order is total.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(now);
        now
    }

    fn remove_rsvps_where(&mut self, keep: impl Fn(&Rsvp) -> bool) -> u64 {
        let doomed: Vec<RsvpId> = self
            .rsvps
            .values()
            .filter(|r| !keep(r))
            .map(|r| r.id)
            .collect();
        for id in &doomed {
            if let Some(rsvp) = self.rsvps.remove(id) {
                self.rsvp_pairs.remove(&(rsvp.event_id, rsvp.user_id));
            }
        }
        doomed.len() as u64
    }

    fn remove_event(&mut self, id: EventId) -> EventRemoval {
        self.events.remove(&id);
        let rsvps_removed = self.remove_rsvps_where(|r| r.event_id != id);
        for notification in self.notifications.values_mut() {
            if notification.event_id == Some(id) {
                notification.event_id = None;
            }
        }
        EventRemoval { rsvps_removed }
    }

    fn rsvped_events(&self, user_id: AccountId) -> impl Iterator<Item = &Event> + '_ {
        self.rsvps
            .values()
            .filter(move |r| r.user_id == user_id)
            .filter_map(move |r| self.events.get(&r.event_id))
    }

    fn owned_notification_mut(
        &mut self,
        id: NotificationId,
        recipient: AccountId,
    ) -> Option<&mut Notification> {
        self.notifications
            .get_mut(&id)
            .filter(|n| n.recipient_id == recipient)
    }

    fn sorted_roles(&self, id: AccountId) -> Vec<Role> {
        self.memberships
            .get(&id)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default()
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Starts with the reference role rows in place, as the migration does.
    pub fn new() -> Self {
        let tables = Tables {
            roles: Role::ALL.into_iter().collect(),
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn draft_into_event(id: EventId, draft: &EventDraft, created_by: Option<AccountId>) -> Event {
    Event {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        starts_at: draft.starts_at,
        location: draft.location.clone(),
        category: draft.category,
        created_by,
    }
}

/// Most frequent first, ties by category name.
fn tally_categories<'a>(events: impl Iterator<Item = &'a Event>) -> Vec<(EventCategory, i64)> {
    let mut counts: HashMap<EventCategory, i64> = HashMap::new();
    for event in events {
        *counts.entry(event.category).or_default() += 1;
    }
    let mut counts: Vec<(EventCategory, i64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.as_str().cmp(b.0.as_str())));
    counts
}

fn newest_start_first(events: &mut [Event]) {
    events.sort_by(|a, b| b.starts_at.cmp(&a.starts_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(&self, registration: &Registration, roles: &[Role]) -> AppResult<Account> {
        let mut t = self.lock()?;
        if t.accounts.values().any(|a| a.email == registration.email) {
            return Err(AppError::AlreadyExists(format!(
                "an account with email {} already exists",
                registration.email
            )));
        }
        if let Some(missing) = roles.iter().find(|r| !t.roles.contains(*r)) {
            return Err(AppError::invalid(format!("role {missing} is not defined")));
        }

        let account = Account {
            id: AccountId::new(),
            display_name: registration.display_name.clone(),
            email: registration.email.clone(),
            created_at: t.tick(),
        };
        t.accounts.insert(account.id, account.clone());
        t.memberships
            .insert(account.id, roles.iter().copied().collect());
        Ok(account)
    }

    async fn find(&self, id: AccountId) -> AppResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<AccountSummary>> {
        let t = self.lock()?;
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut accounts: Vec<AccountSummary> = t
            .accounts
            .values()
            .filter(|a| match &needle {
                Some(n) => {
                    a.display_name.to_lowercase().contains(n) || a.email.to_lowercase().contains(n)
                }
                None => true,
            })
            .map(|a| AccountSummary {
                account: a.clone(),
                roles: t.sorted_roles(a.id),
            })
            .collect();
        accounts.sort_by(|a, b| a.account.display_name.cmp(&b.account.display_name));
        Ok(accounts)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.lock()?.accounts.len() as i64)
    }

    async fn roles_of(&self, id: AccountId) -> AppResult<Vec<Role>> {
        Ok(self.lock()?.sorted_roles(id))
    }

    async fn ensure_role(&self, role: Role) -> AppResult<()> {
        self.lock()?.roles.insert(role);
        Ok(())
    }

    async fn grant_role(&self, id: AccountId, role: Role) -> AppResult<bool> {
        let mut t = self.lock()?;
        if !t.accounts.contains_key(&id) {
            return Err(AppError::not_found("account"));
        }
        if !t.roles.contains(&role) {
            return Err(AppError::invalid(format!("role {role} is not defined")));
        }
        Ok(t.memberships.entry(id).or_default().insert(role))
    }

    async fn revoke_role(&self, id: AccountId, role: Role) -> AppResult<bool> {
        let mut t = self.lock()?;
        Ok(t.memberships
            .get_mut(&id)
            .map(|roles| roles.remove(&role))
            .unwrap_or(false))
    }

    async fn delete_cascade(&self, id: AccountId) -> AppResult<Option<AccountRemoval>> {
        let mut t = self.lock()?;
        if !t.accounts.contains_key(&id) {
            return Ok(None);
        }

        let mut orphaned_events = 0;
        for event in t.events.values_mut() {
            if event.created_by == Some(id) {
                event.created_by = None;
                orphaned_events += 1;
            }
        }

        let rsvps_removed = t.remove_rsvps_where(|r| r.user_id != id);

        let before = t.notifications.len();
        t.notifications.retain(|_, n| n.recipient_id != id);
        let notifications_removed = (before - t.notifications.len()) as u64;

        t.memberships.remove(&id);
        t.accounts.remove(&id);

        Ok(Some(AccountRemoval {
            orphaned_events,
            rsvps_removed,
            notifications_removed,
        }))
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn insert(&self, owner: AccountId, draft: &EventDraft) -> AppResult<Event> {
        let mut t = self.lock()?;
        if !t.accounts.contains_key(&owner) {
            return Err(AppError::not_found("account"));
        }
        let id = EventId(t.next_id());
        let event = draft_into_event(id, draft, Some(owner));
        t.events.insert(id, event.clone());
        Ok(event)
    }

    async fn insert_unowned(&self, draft: &EventDraft) -> AppResult<Event> {
        let mut t = self.lock()?;
        let id = EventId(t.next_id());
        let event = draft_into_event(id, draft, None);
        t.events.insert(id, event.clone());
        Ok(event)
    }

    async fn find(&self, id: EventId) -> AppResult<Option<Event>> {
        Ok(self.lock()?.events.get(&id).cloned())
    }

    async fn update(&self, id: EventId, draft: &EventDraft, scope: EventScope) -> AppResult<Option<Event>> {
        let mut t = self.lock()?;
        Ok(t.events
            .get_mut(&id)
            .filter(|e| scope.admits(e))
            .map(|event| {
                *event = draft_into_event(id, draft, event.created_by);
                event.clone()
            }))
    }

    async fn delete(&self, id: EventId, scope: EventScope) -> AppResult<Option<EventRemoval>> {
        let mut t = self.lock()?;
        if !t.events.get(&id).is_some_and(|e| scope.admits(e)) {
            return Ok(None);
        }
        Ok(Some(t.remove_event(id)))
    }

    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let t = self.lock()?;
        let mut events: Vec<Event> = t
            .events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn list_owned_by(&self, owner: AccountId) -> AppResult<Vec<Event>> {
        let t = self.lock()?;
        let mut events: Vec<Event> = t
            .events
            .values()
            .filter(|e| e.created_by == Some(owner))
            .cloned()
            .collect();
        newest_start_first(&mut events);
        Ok(events)
    }

    async fn list_orphaned(&self) -> AppResult<Vec<Event>> {
        let t = self.lock()?;
        let mut events: Vec<Event> = t
            .events
            .values()
            .filter(|e| e.is_orphaned())
            .cloned()
            .collect();
        newest_start_first(&mut events);
        Ok(events)
    }

    async fn reassign_orphaned(&self, id: EventId, new_owner: AccountId) -> AppResult<Option<Event>> {
        let mut t = self.lock()?;
        if !t.accounts.contains_key(&new_owner) {
            return Ok(None);
        }
        Ok(t.events
            .get_mut(&id)
            .filter(|e| e.is_orphaned())
            .map(|event| {
                event.created_by = Some(new_owner);
                event.clone()
            }))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.lock()?.events.len() as i64)
    }

    async fn count_orphaned(&self) -> AppResult<i64> {
        Ok(self
            .lock()?
            .events
            .values()
            .filter(|e| e.is_orphaned())
            .count() as i64)
    }

    async fn count_owned_by(&self, owner: AccountId) -> AppResult<i64> {
        Ok(self
            .lock()?
            .events
            .values()
            .filter(|e| e.created_by == Some(owner))
            .count() as i64)
    }

    async fn count_upcoming_and_past(&self, now: DateTime<Utc>) -> AppResult<(i64, i64)> {
        let t = self.lock()?;
        let upcoming = t.events.values().filter(|e| e.starts_at >= now).count() as i64;
        Ok((upcoming, t.events.len() as i64 - upcoming))
    }

    async fn count_by_category(&self) -> AppResult<Vec<(EventCategory, i64)>> {
        let t = self.lock()?;
        Ok(tally_categories(t.events.values()))
    }

    async fn most_popular(&self) -> AppResult<Option<(Event, i64)>> {
        let t = self.lock()?;
        let mut best: Option<(&Event, i64)> = None;
        // Ascending id order, so only a strictly larger count displaces.
        for event in t.events.values() {
            let rsvps = t.rsvps.values().filter(|r| r.event_id == event.id).count() as i64;
            if best.map_or(true, |(_, top)| rsvps > top) {
                best = Some((event, rsvps));
            }
        }
        Ok(best.map(|(event, rsvps)| (event.clone(), rsvps)))
    }
}

#[async_trait]
impl RsvpRepository for MemoryStore {
    async fn create(&self, event_id: EventId, user_id: AccountId) -> AppResult<RsvpReceipt> {
        let mut t = self.lock()?;
        let event = t
            .events
            .get(&event_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("event"))?;
        let attendee_name = t
            .accounts
            .get(&user_id)
            .map(|a| a.display_name.clone())
            .ok_or_else(|| AppError::not_found("account"))?;

        // Unique index on (event_id, user_id).
        if !t.rsvp_pairs.insert((event_id, user_id)) {
            return Err(AppError::AlreadyExists(
                "you have already RSVP'd to this event".into(),
            ));
        }

        let rsvp = Rsvp {
            id: RsvpId(t.next_id()),
            event_id,
            user_id,
            created_at: t.tick(),
        };
        t.rsvps.insert(rsvp.id, rsvp.clone());

        let notification = match NewNotification::for_rsvp(&event, user_id, Some(&attendee_name)) {
            Some(notice) => {
                let notification = Notification {
                    id: NotificationId(t.next_id()),
                    recipient_id: notice.recipient_id,
                    event_id: Some(notice.event_id),
                    message: notice.message,
                    is_read: false,
                    created_at: t.tick(),
                };
                let id = notification.id;
                t.notifications.insert(id, notification);
                Some(id)
            }
            None => None,
        };

        Ok(RsvpReceipt { rsvp, notification })
    }

    async fn withdraw(&self, event_id: EventId, user_id: AccountId) -> AppResult<bool> {
        let mut t = self.lock()?;
        if !t.rsvp_pairs.contains(&(event_id, user_id)) {
            return Ok(false);
        }
        let removed = t.remove_rsvps_where(|r| !(r.event_id == event_id && r.user_id == user_id));
        Ok(removed == 1)
    }

    async fn attendees(&self, event_id: EventId) -> AppResult<Vec<Attendee>> {
        let t = self.lock()?;
        let mut rsvps: Vec<&Rsvp> = t.rsvps.values().filter(|r| r.event_id == event_id).collect();
        rsvps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(rsvps
            .into_iter()
            .filter_map(|r| {
                t.accounts.get(&r.user_id).map(|a| Attendee {
                    user_id: a.id,
                    display_name: a.display_name.clone(),
                    rsvp_at: r.created_at,
                })
            })
            .collect())
    }

    async fn count_for_event(&self, event_id: EventId) -> AppResult<i64> {
        Ok(self
            .lock()?
            .rsvps
            .values()
            .filter(|r| r.event_id == event_id)
            .count() as i64)
    }

    async fn exists(&self, event_id: EventId, user_id: AccountId) -> AppResult<bool> {
        Ok(self.lock()?.rsvp_pairs.contains(&(event_id, user_id)))
    }

    async fn events_for(&self, user_id: AccountId) -> AppResult<Vec<Event>> {
        let t = self.lock()?;
        let mut events: Vec<Event> = t.rsvped_events(user_id).cloned().collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.lock()?.rsvps.len() as i64)
    }

    async fn count_by_user(&self, user_id: AccountId) -> AppResult<i64> {
        Ok(self
            .lock()?
            .rsvps
            .values()
            .filter(|r| r.user_id == user_id)
            .count() as i64)
    }

    async fn count_received_by(&self, owner: AccountId) -> AppResult<i64> {
        let t = self.lock()?;
        Ok(t.rsvps
            .values()
            .filter(|r| {
                t.events
                    .get(&r.event_id)
                    .is_some_and(|e| e.created_by == Some(owner))
            })
            .count() as i64)
    }

    async fn count_attendance(&self, user_id: AccountId, now: DateTime<Utc>) -> AppResult<(i64, i64)> {
        let t = self.lock()?;
        let (attended, upcoming) = t
            .rsvped_events(user_id)
            .fold((0, 0), |(past, ahead), e| {
                if e.starts_at < now {
                    (past + 1, ahead)
                } else {
                    (past, ahead + 1)
                }
            });
        Ok((attended, upcoming))
    }

    async fn favourite_category(&self, user_id: AccountId) -> AppResult<Option<(EventCategory, i64)>> {
        let t = self.lock()?;
        Ok(tally_categories(t.rsvped_events(user_id)).into_iter().next())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn recent_for(&self, recipient: AccountId, limit: i64) -> AppResult<Vec<NotificationWithEvent>> {
        let t = self.lock()?;
        let mut mine: Vec<&Notification> = t
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(mine
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|n| NotificationWithEvent {
                notification: n.clone(),
                event: n.event_id.and_then(|id| t.events.get(&id).cloned()),
            })
            .collect())
    }

    async fn mark_read(&self, id: NotificationId, recipient: AccountId) -> AppResult<bool> {
        let mut t = self.lock()?;
        Ok(t.owned_notification_mut(id, recipient)
            .map(|n| n.is_read = true)
            .is_some())
    }

    async fn mark_all_read(&self, recipient: AccountId) -> AppResult<u64> {
        let mut t = self.lock()?;
        let mut flipped = 0;
        for n in t.notifications.values_mut() {
            if n.recipient_id == recipient && !n.is_read {
                n.is_read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn delete(&self, id: NotificationId, recipient: AccountId) -> AppResult<bool> {
        let mut t = self.lock()?;
        if t.owned_notification_mut(id, recipient).is_none() {
            return Ok(false);
        }
        Ok(t.notifications.remove(&id).is_some())
    }

    async fn unread_count(&self, recipient: AccountId) -> AppResult<i64> {
        Ok(self
            .lock()?
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient && !n.is_read)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn account(store: &MemoryStore, name: &str) -> Account {
        let reg = Registration::new(name, format!("{}@example.com", name.to_lowercase()));
        AccountRepository::create(store, &reg, &[Role::User]).await.unwrap()
    }

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.into(),
            description: "desc".into(),
            starts_at: Utc::now() + Duration::days(2),
            location: "Borås".into(),
            category: EventCategory::Other,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        account(&store, "Ann").await;
        let reg = Registration::new("Ann Again", "ann@example.com");
        let err = AccountRepository::create(&store, &reg, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn deleting_an_event_keeps_notifications_but_detaches_them() {
        let store = MemoryStore::new();
        let owner = account(&store, "Owner").await;
        let guest = account(&store, "Guest").await;
        let event = EventRepository::insert(&store, owner.id, &draft("Picnic"))
            .await
            .unwrap();

        RsvpRepository::create(&store, event.id, guest.id).await.unwrap();
        let removal = EventRepository::delete(&store, event.id, EventScope::Any)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removal.rsvps_removed, 1);

        let inbox = store.recent_for(owner.id, 50).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification.event_id, None);
        assert!(inbox[0].event.is_none());
        assert_eq!(RsvpRepository::count(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn withdrawn_pair_can_rsvp_again() {
        let store = MemoryStore::new();
        let owner = account(&store, "Owner").await;
        let event = EventRepository::insert(&store, owner.id, &draft("Quiz"))
            .await
            .unwrap();

        RsvpRepository::create(&store, event.id, owner.id).await.unwrap();
        assert!(store.withdraw(event.id, owner.id).await.unwrap());
        assert!(!store.withdraw(event.id, owner.id).await.unwrap());
        RsvpRepository::create(&store, event.id, owner.id).await.unwrap();
        assert_eq!(store.count_for_event(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reassign_requires_an_existing_account() {
        let store = MemoryStore::new();
        let event = store.insert_unowned(&draft("Lost")).await.unwrap();
        assert!(store
            .reassign_orphaned(event.id, AccountId::new())
            .await
            .unwrap()
            .is_none());
        assert!(EventRepository::find(&store, event.id)
            .await
            .unwrap()
            .unwrap()
            .is_orphaned());
    }

    #[tokio::test]
    async fn scoped_writes_skip_rows_that_changed_owner() {
        let store = MemoryStore::new();
        let owner = account(&store, "Owner").await;
        let event = EventRepository::insert(&store, owner.id, &draft("Swap Meet"))
            .await
            .unwrap();
        store.delete_cascade(owner.id).await.unwrap();

        let scope = EventScope::OwnedBy(owner.id);
        assert!(store.update(event.id, &draft("Renamed"), scope).await.unwrap().is_none());
        assert!(EventRepository::delete(&store, event.id, scope).await.unwrap().is_none());

        let kept = EventRepository::find(&store, event.id).await.unwrap().unwrap();
        assert_eq!(kept.title, "Swap Meet");

        let renamed = store
            .update(event.id, &draft("Renamed"), EventScope::Orphaned)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "Renamed");
        assert!(renamed.is_orphaned());
    }

    #[tokio::test]
    async fn profile_counts_split_at_the_given_instant() {
        let store = MemoryStore::new();
        let owner = account(&store, "Owner").await;
        let fan = account(&store, "Fan").await;

        let mut gig = draft("Gig");
        gig.category = EventCategory::Concert;
        let gig = EventRepository::insert(&store, owner.id, &gig).await.unwrap();
        let fair = EventRepository::insert(&store, owner.id, &draft("Fair"))
            .await
            .unwrap();
        RsvpRepository::create(&store, gig.id, fan.id).await.unwrap();
        RsvpRepository::create(&store, fair.id, fan.id).await.unwrap();
        RsvpRepository::create(&store, gig.id, owner.id).await.unwrap();

        assert_eq!(store.count_owned_by(owner.id).await.unwrap(), 2);
        assert_eq!(store.count_received_by(owner.id).await.unwrap(), 3);
        assert_eq!(store.count_by_user(fan.id).await.unwrap(), 2);

        let now = Utc::now();
        assert_eq!(store.count_attendance(fan.id, now).await.unwrap(), (0, 2));
        let later = now + Duration::days(30);
        assert_eq!(store.count_attendance(fan.id, later).await.unwrap(), (2, 0));
        assert_eq!(store.count_upcoming_and_past(later).await.unwrap(), (0, 2));

        // One concert, one other: the tie goes to "concert".
        assert_eq!(
            store.favourite_category(fan.id).await.unwrap(),
            Some((EventCategory::Concert, 1))
        );
        assert_eq!(store.favourite_category(AccountId::new()).await.unwrap(), None);

        let (top, rsvps) = store.most_popular().await.unwrap().unwrap();
        assert_eq!((top.id, rsvps), (gig.id, 2));
    }
}
