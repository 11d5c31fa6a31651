#![allow(dead_code)]

use chrono::{Duration, Utc};
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name},
    Fake,
};
use std::sync::Arc;
use townsquare::{
    config::SeedConfig,
    models::{Account, Event, EventInput},
    repository::Repositories,
    services::{seed, NoWeather},
    AppState,
};

pub struct World {
    pub repos: Repositories,
    pub state: Arc<AppState>,
    pub admin: Account,
}

/// In-memory store, seeded admin, weather disabled.
pub async fn world() -> World {
    let repos = Repositories::in_memory();
    let admin = seed::run(&repos, &SeedConfig::default())
        .await
        .expect("seed");
    let state = AppState::new(&repos, Arc::new(NoWeather));
    World { repos, state, admin }
}

impl World {
    pub async fn member(&self) -> Account {
        let name: String = Name().fake();
        let email: String = SafeEmail().fake();
        let email = format!("{}-{}", uuid::Uuid::new_v4().simple(), email);
        self.state
            .accounts
            .register(&name, &email)
            .await
            .expect("register member")
    }

    pub async fn event_by(&self, owner: &Account, title: &str, days_ahead: i64) -> Event {
        self.state
            .catalog
            .create(owner.id, event_input(title, days_ahead))
            .await
            .expect("create event")
    }
}

pub fn event_input(title: &str, days_ahead: i64) -> EventInput {
    EventInput {
        title: title.to_string(),
        description: format!("{title} for the whole neighbourhood"),
        location: "Stadsparken, Borås".to_string(),
        category: "other".to_string(),
        starts_at: Some(Utc::now() + Duration::days(days_ahead)),
    }
}
