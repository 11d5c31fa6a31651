pub mod account;
pub mod event;
pub mod id;
pub mod notification;
pub mod rsvp;

pub use account::{Account, AccountSummary, Role};
pub use event::{Event, EventCategory, EventDraft, EventFilter, EventInput};
pub use id::{AccountId, EventId, NotificationId, RsvpId};
pub use notification::{NewNotification, Notification, NotificationWithEvent};
pub use rsvp::{Attendee, Rsvp, RsvpReceipt};
