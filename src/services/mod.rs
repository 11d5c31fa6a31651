pub mod accounts;
pub mod admin;
pub mod catalog;
pub mod notifications;
pub mod rsvp;
pub mod seed;
pub mod weather;

pub use accounts::AccountDirectory;
pub use admin::{AccountDetails, AdminReconciliation, EventStatistics, PopularEvent};
pub use catalog::{EventCatalog, EventDetails};
pub use notifications::NotificationMailbox;
pub use rsvp::{ProfileStats, RsvpEngine};
pub use weather::{Forecast, NoWeather, OpenMeteoClient, WeatherProvider};
