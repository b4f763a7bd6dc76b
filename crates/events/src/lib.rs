//! Outbound side effects of class rollout mutations.
//!
//! - [`delivery`]: the calendar service and email channels.
//! - [`OutboxDispatcher`]: background service that drains `sync_outbox`
//!   through those channels with retry and dead-lettering.

pub mod delivery;
pub mod dispatcher;

pub use delivery::calendar::{
    CalendarConfig, CalendarError, CalendarService, DisabledCalendar, HttpCalendarClient,
};
pub use delivery::email::{
    DisabledMailer, EmailConfig, EmailDelivery, EmailError, NotificationSender,
};
pub use dispatcher::{BatchSummary, DeliveryError, OutboxConfig, OutboxDispatcher};
