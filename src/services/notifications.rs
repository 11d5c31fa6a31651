use std::sync::Arc;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{AccountId, NotificationId, NotificationWithEvent},
    repository::{NotificationRepository, Repositories, MAILBOX_PAGE_SIZE},
};

/// Per-recipient view of RSVP notices. Someone else's notification and a
/// missing one are indistinguishable to the caller.
#[derive(Clone)]
pub struct NotificationMailbox {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationMailbox {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            notifications: repos.notifications.clone(),
        }
    }

    pub async fn list_for_recipient(
        &self,
        user_id: AccountId,
        limit: Option<i64>,
    ) -> AppResult<Vec<NotificationWithEvent>> {
        let limit = limit
            .unwrap_or(MAILBOX_PAGE_SIZE)
            .clamp(1, MAILBOX_PAGE_SIZE);
        self.notifications.recent_for(user_id, limit).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_read(&self, id: NotificationId, user_id: AccountId) -> AppResult<()> {
        if self.notifications.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("notification"))
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: AccountId) -> AppResult<u64> {
        let changed = self.notifications.mark_all_read(user_id).await?;
        info!("{} notifications marked read", changed);
        Ok(changed)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: NotificationId, user_id: AccountId) -> AppResult<()> {
        if self.notifications.delete(id, user_id).await? {
            info!("notification {} deleted", id);
            Ok(())
        } else {
            Err(AppError::not_found("notification"))
        }
    }

    pub async fn unread_count(&self, user_id: AccountId) -> AppResult<i64> {
        self.notifications.unread_count(user_id).await
    }
}
