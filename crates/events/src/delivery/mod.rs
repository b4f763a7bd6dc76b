//! External delivery channels for outbox messages.
//!
//! Each channel is an async trait with a real implementation and a disabled
//! one used when its configuration is absent.

pub mod calendar;
pub mod email;
