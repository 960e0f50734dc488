use std::collections::HashMap;

use time::OffsetDateTime;

use super::{Event, EventType};

const DEFAULT_MAX_EVENTS: i64 = 10;

/// Filter describing which events a watch or history query is interested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    /// Container the events belong to, e.g. `/` or `/docker/<id>`.
    pub container_name: String,
    /// Whether events of descendants of `container_name` match too.
    pub include_subcontainers: bool,
    /// Enabled event kinds. Kinds missing from the map are disabled.
    pub event_type: HashMap<EventType, bool>,
    /// Upper bound for historical queries; zero or negative means unbounded.
    pub max_events_returned: i64,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
}

impl Default for EventRequest {
    fn default() -> Self {
        Self {
            container_name: "/".to_owned(),
            include_subcontainers: false,
            event_type: EventType::ALL.iter().map(|t| (*t, true)).collect(),
            max_events_returned: DEFAULT_MAX_EVENTS,
            start_time: None,
            end_time: None,
        }
    }
}

impl EventRequest {
    pub fn is_enabled(&self, event_type: EventType) -> bool {
        self.event_type.get(&event_type).copied().unwrap_or(false)
    }

    /// Returns `true` if `event` passes every criterion of this request.
    pub fn matches(&self, event: &Event) -> bool {
        if !self.is_enabled(event.event_type) {
            return false;
        }
        if self.start_time.is_some_and(|start| event.timestamp < start) {
            return false;
        }
        if self.end_time.is_some_and(|end| event.timestamp > end) {
            return false;
        }
        self.matches_container(&event.container_name)
    }

    fn matches_container(&self, name: &str) -> bool {
        if name == self.container_name {
            return true;
        }
        if !self.include_subcontainers {
            return false;
        }
        if self.container_name == "/" {
            return true;
        }
        name.strip_prefix(self.container_name.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}
