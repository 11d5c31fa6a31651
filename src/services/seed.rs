use chrono::{DateTime, Duration, Utc};
use tracing::info;
use validator::Validate;

use crate::{
    config::SeedConfig,
    error::AppResult,
    models::{account::Registration, Account, EventCategory, EventDraft, Role},
    repository::Repositories,
};

struct SampleEvent {
    title: &'static str,
    description: &'static str,
    days_ahead: i64,
    location: &'static str,
    category: EventCategory,
}

const SAMPLE_EVENTS: &[SampleEvent] = &[
    SampleEvent {
        title: "Jazz Concert in the Park",
        description: "Enjoy an evening of smooth jazz with local musicians. Bring your blankets and picnic baskets for a relaxing night under the stars.",
        days_ahead: 7,
        location: "Central Park, Borås",
        category: EventCategory::Concert,
    },
    SampleEvent {
        title: "Farmers Market",
        description: "Fresh local produce, artisan crafts and homemade goods. Support local farmers and craftspeople while enjoying the community atmosphere.",
        days_ahead: 3,
        location: "Town Square, Borås",
        category: EventCategory::Market,
    },
    SampleEvent {
        title: "Coding Workshop: Web Services in Rust",
        description: "Learn the fundamentals of building web services. Suitable for beginners with some programming experience. Laptops required.",
        days_ahead: 14,
        location: "Tech Hub, Allégatan 1, Borås",
        category: EventCategory::Workshop,
    },
    SampleEvent {
        title: "Charity Run for Children",
        description: "5K and 10K runs to raise funds for local children's charities. All fitness levels welcome. Registration includes a t-shirt and refreshments.",
        days_ahead: 21,
        location: "Borås Stadium",
        category: EventCategory::Sports,
    },
    SampleEvent {
        title: "Summer Food Festival",
        description: "Taste dishes from around the world prepared by local restaurants and food trucks. Live music and family activities throughout the day.",
        days_ahead: 30,
        location: "Stadsparken, Borås",
        category: EventCategory::Other,
    },
    SampleEvent {
        title: "Photography Exhibition Opening",
        description: "Opening night of 'Urban Perspectives', a collection of street photography from Borås and surrounding areas. Meet the artists and enjoy complimentary refreshments.",
        days_ahead: 10,
        location: "Borås Art Museum",
        category: EventCategory::Other,
    },
];

impl SampleEvent {
    fn draft(&self, now: DateTime<Utc>) -> EventDraft {
        EventDraft {
            title: self.title.to_string(),
            description: self.description.to_string(),
            starts_at: now + Duration::days(self.days_ahead),
            location: self.location.to_string(),
            category: self.category,
        }
    }
}

/// Idempotent startup bootstrap. Safe to run on every boot.
pub async fn run(repos: &Repositories, config: &SeedConfig) -> AppResult<Account> {
    for role in Role::ALL {
        repos.accounts.ensure_role(role).await?;
    }

    let admin = ensure_admin(repos, config).await?;

    if config.sample_events && repos.events.count().await? == 0 {
        let now = Utc::now();
        for sample in SAMPLE_EVENTS {
            repos.events.insert_unowned(&sample.draft(now)).await?;
        }
        info!("seeded {} sample events", SAMPLE_EVENTS.len());
    }

    Ok(admin)
}

async fn ensure_admin(repos: &Repositories, config: &SeedConfig) -> AppResult<Account> {
    let registration = Registration::new(&config.admin_display_name, &config.admin_email);
    registration.validate()?;

    match repos.accounts.find_by_email(&registration.email).await? {
        Some(existing) => {
            for role in [Role::Admin, Role::User] {
                if repos.accounts.grant_role(existing.id, role).await? {
                    info!("restored role {} on admin account {}", role, existing.id);
                }
            }
            Ok(existing)
        }
        None => {
            let admin = repos
                .accounts
                .create(&registration, &[Role::Admin, Role::User])
                .await?;
            info!("created admin account {} <{}>", admin.id, admin.email);
            Ok(admin)
        }
    }
}
