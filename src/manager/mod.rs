//! The manager is the API's view onto monitored containers and their events.
//!
//! Request handlers only ever talk to the [`Manager`] trait. [`InMemoryManager`] is the
//! implementation used by the server; discovery components feed it containers, stats samples
//! and out-of-memory notifications, and it turns lifecycle changes into events.
mod error;
mod memory;

pub use error::{Error, Result};
pub use memory::InMemoryManager;

use crate::events::{Event, EventChannel, EventRequest, WatchId};
use crate::info::{ContainerInfo, ContainerInfoRequest};
use crate::machine::MachineInfo;

pub trait Manager: Send + Sync {
    fn machine_info(&self) -> Result<MachineInfo>;

    /// Returns the info of a single container with stats selected by `query`.
    fn container_info(&self, name: &str, query: &ContainerInfoRequest) -> Result<ContainerInfo>;

    /// Returns the info of `name` and all of its descendants, ordered by name.
    fn subcontainers_info(
        &self,
        name: &str,
        query: &ContainerInfoRequest,
    ) -> Result<Vec<ContainerInfo>>;

    /// Registers a watch for future events matching `request`.
    ///
    /// The returned channel must be released with [`Manager::close_event_channel`].
    fn watch_for_events(&self, request: &EventRequest) -> Result<EventChannel>;

    fn past_events(&self, request: &EventRequest) -> Result<Vec<Event>>;

    fn close_event_channel(&self, watch_id: WatchId);
}
