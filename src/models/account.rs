use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use validator::Validate;

use super::id::AccountId;
use crate::error::AppError;

/// Directory entry for a community member. Credentials live with the
/// identity component, never here.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    #[serde(flatten)]
    pub account: Account,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, max = 80, message = "display name must be 1-80 characters"))]
    pub display_name: String,
    #[validate(
        email(message = "email must be a valid address"),
        length(max = 256, message = "email must be at most 256 characters")
    )]
    pub email: String,
}

impl Registration {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into().trim().to_string(),
            email: email.into().trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::invalid(format!("unrecognized role '{s}'")))
    }
}
