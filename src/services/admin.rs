//! Operator workflows that repair what account deletion leaves behind and
//! manage role grants. Every entry point re-checks that the actor holds
//! `Admin`; route guards are not trusted for this.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::accounts::AccountDirectory;
use crate::{
    error::{AppError, AppResult},
    models::{AccountId, AccountSummary, Event, EventCategory, EventId, Role},
    repository::{
        AccountRemoval, AccountRepository, EventRemoval, EventRepository, EventScope,
        Repositories, RsvpRepository,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub accounts: i64,
    pub events: i64,
    pub rsvps: i64,
    pub orphaned_events: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: EventCategory,
    pub events: i64,
}

/// One member as the account screen shows them.
#[derive(Debug, Clone, Serialize)]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: AccountSummary,
    pub events_created: i64,
    pub rsvps: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularEvent {
    #[serde(flatten)]
    pub event: Event,
    pub rsvps: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventStatistics {
    pub by_category: Vec<CategoryCount>,
    pub upcoming: i64,
    pub past: i64,
    pub most_popular: Option<PopularEvent>,
}

#[derive(Clone)]
pub struct AdminReconciliation {
    accounts: Arc<dyn AccountRepository>,
    events: Arc<dyn EventRepository>,
    rsvps: Arc<dyn RsvpRepository>,
    directory: AccountDirectory,
}

impl AdminReconciliation {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            accounts: repos.accounts.clone(),
            events: repos.events.clone(),
            rsvps: repos.rsvps.clone(),
            directory: AccountDirectory::new(repos),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, user_id: AccountId, acting_admin: AccountId) -> AppResult<AccountRemoval> {
        self.directory.require_admin(acting_admin).await?;
        if user_id == acting_admin {
            return Err(AppError::invalid("administrators cannot delete their own account"));
        }

        let removal = self
            .accounts
            .delete_cascade(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("account"))?;

        info!(
            "account {} deleted by {}: {} events orphaned, {} rsvps and {} notifications removed",
            user_id,
            acting_admin,
            removal.orphaned_events,
            removal.rsvps_removed,
            removal.notifications_removed
        );
        Ok(removal)
    }

    pub async fn list_orphaned_events(&self, actor: AccountId) -> AppResult<Vec<Event>> {
        self.directory.require_admin(actor).await?;
        self.events.list_orphaned().await
    }

    /// Succeeds only if the event is still orphaned when the delete commits.
    #[tracing::instrument(skip(self))]
    pub async fn delete_orphaned_event(&self, event_id: EventId, actor: AccountId) -> AppResult<EventRemoval> {
        self.directory.require_admin(actor).await?;

        let removal = self
            .events
            .delete(event_id, EventScope::Orphaned)
            .await?
            .ok_or_else(|| AppError::not_found("orphaned event"))?;
        info!("orphaned event {} deleted by {}", event_id, actor);
        Ok(removal)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reassign_event(
        &self,
        event_id: EventId,
        new_owner: AccountId,
        actor: AccountId,
    ) -> AppResult<Event> {
        self.directory.require_admin(actor).await?;

        if !self.directory.exists(new_owner).await? {
            return Err(AppError::not_found("account"));
        }
        // The store re-checks both conditions atomically.
        let event = self
            .events
            .reassign_orphaned(event_id, new_owner)
            .await?
            .ok_or_else(|| AppError::not_found("orphaned event"))?;

        info!("event {} reassigned to {} by {}", event_id, new_owner, actor);
        Ok(event)
    }

    #[tracing::instrument(skip(self))]
    pub async fn grant_role(&self, user_id: AccountId, role_name: &str, actor: AccountId) -> AppResult<bool> {
        self.directory.require_admin(actor).await?;
        let role: Role = role_name.parse()?;

        if !self.directory.exists(user_id).await? {
            return Err(AppError::not_found("account"));
        }
        let added = self.accounts.grant_role(user_id, role).await?;
        info!("role {} granted to {} (new: {})", role, user_id, added);
        Ok(added)
    }

    #[tracing::instrument(skip(self))]
    pub async fn revoke_role(&self, user_id: AccountId, role_name: &str, actor: AccountId) -> AppResult<bool> {
        self.directory.require_admin(actor).await?;
        let role: Role = role_name.parse()?;

        if role == Role::Admin && user_id == actor {
            warn!("{} attempted to revoke their own admin role", actor);
            return Err(AppError::invalid("administrators cannot revoke their own admin role"));
        }
        if !self.directory.exists(user_id).await? {
            return Err(AppError::not_found("account"));
        }
        let removed = self.accounts.revoke_role(user_id, role).await?;
        info!("role {} revoked from {} (held: {})", role, user_id, removed);
        Ok(removed)
    }

    pub async fn overview(&self, actor: AccountId) -> AppResult<Overview> {
        self.directory.require_admin(actor).await?;
        let (accounts, events, rsvps, orphaned_events) = futures::try_join!(
            self.accounts.count(),
            self.events.count(),
            self.rsvps.count(),
            self.events.count_orphaned(),
        )?;
        Ok(Overview {
            accounts,
            events,
            rsvps,
            orphaned_events,
        })
    }

    /// Most frequent category first.
    pub async fn category_breakdown(&self, actor: AccountId) -> AppResult<Vec<CategoryCount>> {
        self.directory.require_admin(actor).await?;
        Ok(self
            .events
            .count_by_category()
            .await?
            .into_iter()
            .map(|(category, events)| CategoryCount { category, events })
            .collect())
    }

    pub async fn event_statistics(&self, actor: AccountId) -> AppResult<EventStatistics> {
        self.directory.require_admin(actor).await?;
        let ((upcoming, past), by_category, most_popular) = futures::try_join!(
            self.events.count_upcoming_and_past(Utc::now()),
            self.events.count_by_category(),
            self.events.most_popular(),
        )?;
        Ok(EventStatistics {
            by_category: by_category
                .into_iter()
                .map(|(category, events)| CategoryCount { category, events })
                .collect(),
            upcoming,
            past,
            most_popular: most_popular.map(|(event, rsvps)| PopularEvent { event, rsvps }),
        })
    }

    pub async fn account_details(&self, user_id: AccountId, actor: AccountId) -> AppResult<AccountDetails> {
        self.directory.require_admin(actor).await?;
        let account = self.directory.find(user_id).await?;
        let (roles, events_created, rsvps) = futures::try_join!(
            self.accounts.roles_of(user_id),
            self.events.count_owned_by(user_id),
            self.rsvps.count_by_user(user_id),
        )?;
        Ok(AccountDetails {
            account: AccountSummary { account, roles },
            events_created,
            rsvps,
        })
    }

    pub async fn list_accounts(&self, search: Option<&str>, actor: AccountId) -> AppResult<Vec<AccountSummary>> {
        self.directory.require_admin(actor).await?;
        self.accounts.list(search).await
    }
}
