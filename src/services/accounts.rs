use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{account::Registration, Account, AccountId, Role},
    repository::{AccountRepository, Repositories},
};

/// Read side of the identity component plus self-service registration.
#[derive(Clone)]
pub struct AccountDirectory {
    accounts: Arc<dyn AccountRepository>,
}

impl AccountDirectory {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            accounts: repos.accounts.clone(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn register(&self, display_name: &str, email: &str) -> AppResult<Account> {
        let registration = Registration::new(display_name, email);
        registration.validate()?;

        let account = self.accounts.create(&registration, &[Role::User]).await?;
        info!("registered account {}", account.id);
        Ok(account)
    }

    pub async fn find(&self, id: AccountId) -> AppResult<Account> {
        self.accounts
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("account"))
    }

    pub async fn exists(&self, id: AccountId) -> AppResult<bool> {
        Ok(self.accounts.find(id).await?.is_some())
    }

    pub async fn roles_of(&self, id: AccountId) -> AppResult<Vec<Role>> {
        self.accounts.roles_of(id).await
    }

    pub async fn is_admin(&self, id: AccountId) -> AppResult<bool> {
        Ok(self.accounts.roles_of(id).await?.contains(&Role::Admin))
    }

    pub(crate) async fn require_admin(&self, actor: AccountId) -> AppResult<()> {
        if self.is_admin(actor).await? {
            Ok(())
        } else {
            Err(AppError::forbidden("administrator privilege required"))
        }
    }
}
