//! Container lifecycle events and their fan-out to watchers.
//!
//! The [`EventHub`] keeps a bounded history of past events and a registry of live watches.
//! Every watch owns an [`EventChannel`] that receives the events matching its
//! [`EventRequest`] until the watch is stopped by its [`WatchId`].
mod hub;
mod request;
mod types;

pub use hub::{EventChannel, EventHub, WatchId};
pub use request::EventRequest;
pub use types::{Event, EventType};
