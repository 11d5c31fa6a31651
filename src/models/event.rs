use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use validator::{Validate, ValidationError};

use super::id::{AccountId, EventId};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Concert,
    Market,
    Workshop,
    Sports,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 5] = [
        EventCategory::Concert,
        EventCategory::Market,
        EventCategory::Workshop,
        EventCategory::Sports,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Concert => "concert",
            EventCategory::Market => "market",
            EventCategory::Workshop => "workshop",
            EventCategory::Sports => "sports",
            EventCategory::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::invalid(format!("unknown category '{s}'")))
    }
}

/// An event row. `created_by` is `None` once the creating account has been
/// removed; the event itself survives.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub category: EventCategory,
    pub created_by: Option<AccountId>,
}

impl Event {
    pub fn is_orphaned(&self) -> bool {
        self.created_by.is_none()
    }
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
    category
        .parse::<EventCategory>()
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("category");
            err.message = Some("category must be one of concert, market, workshop, sports, other".into());
            err
        })
}

/// Raw event fields as submitted by a client. Absent fields deserialize as
/// empty so that validation reports them.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EventInput {
    #[validate(length(min = 1, max = 120, message = "title is required and must be at most 120 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 4000, message = "description is required and must be at most 4000 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 160, message = "location is required and must be at most 160 characters"))]
    pub location: String,
    #[validate(custom(function = "validate_category"))]
    pub category: String,
    #[validate(required(message = "start time is required"))]
    pub starts_at: Option<DateTime<Utc>>,
}

/// Validated event fields. Only obtainable through [`EventInput::into_draft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub category: EventCategory,
}

impl EventInput {
    pub fn into_draft(self) -> AppResult<EventDraft> {
        let input = EventInput {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            category: self.category.trim().to_string(),
            starts_at: self.starts_at,
        };
        input.validate()?;

        let category = input.category.parse()?;
        let starts_at = input
            .starts_at
            .ok_or_else(|| AppError::Internal("validated start time missing".into()))?;

        Ok(EventDraft {
            title: input.title,
            description: input.description,
            starts_at,
            location: input.location,
            category,
        })
    }
}

/// Listing filter. Every option is independent and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub keyword: Option<String>,
    pub category: Option<EventCategory>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        let keyword = keyword.trim();
        self.keyword = (!keyword.is_empty()).then(|| keyword.to_string());
        self
    }

    pub fn category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn starting_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn starting_until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// In-process evaluation with the same semantics as the SQL rendering.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(keyword) = &self.keyword {
            let needle = keyword.to_lowercase();
            let hit = [&event.title, &event.description, &event.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.category.is_some_and(|c| c != event.category) {
            return false;
        }
        if self.from.is_some_and(|from| event.starts_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| event.starts_at > to) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn input() -> EventInput {
        EventInput {
            title: "Farmers Market".into(),
            description: "Fresh local produce".into(),
            location: "Town Square, Borås".into(),
            category: "market".into(),
            starts_at: Some(Utc::now() + Duration::days(3)),
        }
    }

    fn event(title: &str, category: EventCategory, starts_at: DateTime<Utc>) -> Event {
        Event {
            id: EventId(1),
            title: title.into(),
            description: "An evening outdoors".into(),
            starts_at,
            location: "Stadsparken, Borås".into(),
            category,
            created_by: None,
        }
    }

    #[test]
    fn valid_input_becomes_draft() {
        let draft = input().into_draft().unwrap();
        assert_eq!(draft.category, EventCategory::Market);
        assert_eq!(draft.title, "Farmers Market");
    }

    #[test]
    fn invalid_input_lists_every_failing_field() {
        let bad = EventInput {
            title: "   ".into(),
            description: "x".repeat(4001),
            location: "y".repeat(161),
            category: "rave".into(),
            starts_at: None,
        };
        let AppError::Validation(fields) = bad.into_draft().unwrap_err() else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            names,
            vec!["category", "description", "location", "starts_at", "title"]
        );
    }

    #[test]
    fn absent_json_fields_reach_validation() {
        let partial: EventInput = serde_json::from_str(r#"{"title":"Jam"}"#).unwrap();
        let AppError::Validation(fields) = partial.into_draft().unwrap_err() else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["category", "description", "location", "starts_at"]);
    }

    #[test]
    fn title_limit_counts_characters() {
        let mut ok = input();
        ok.title = "å".repeat(120);
        assert!(ok.into_draft().is_ok());

        let mut too_long = input();
        too_long.title = "å".repeat(121);
        assert!(too_long.into_draft().is_err());
    }

    #[test]
    fn filter_matches_keyword_in_any_text_field_ignoring_case() {
        let e = event("Jazz Concert", EventCategory::Concert, Utc::now());
        assert!(EventFilter::new().keyword("jazz").matches(&e));
        assert!(EventFilter::new().keyword("STADSPARKEN").matches(&e));
        assert!(EventFilter::new().keyword("outdoors").matches(&e));
        assert!(!EventFilter::new().keyword("chess").matches(&e));
    }

    #[test]
    fn blank_keyword_is_ignored() {
        assert_eq!(EventFilter::new().keyword("   ").keyword, None);
    }

    #[test]
    fn filter_options_combine_with_and() {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 18, 0, 0).unwrap();
        let e = event("Jazz Concert", EventCategory::Concert, start);

        let window = EventFilter::new()
            .category(EventCategory::Concert)
            .starting_from(start - Duration::days(1))
            .starting_until(start);
        assert!(window.matches(&e));

        assert!(!window.clone().category(EventCategory::Sports).matches(&e));
        assert!(!EventFilter::new()
            .starting_from(start + Duration::seconds(1))
            .matches(&e));
        assert!(!EventFilter::new()
            .starting_until(start - Duration::seconds(1))
            .matches(&e));
    }
}
