use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Oom,
    OomKill,
    ContainerCreation,
    ContainerDeletion,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Oom,
        EventType::OomKill,
        EventType::ContainerCreation,
        EventType::ContainerDeletion,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Event {
    pub container_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub event_type: EventType,
}

impl Event {
    pub fn new(
        container_name: impl Into<String>,
        timestamp: OffsetDateTime,
        event_type: EventType,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            timestamp,
            event_type,
        }
    }
}
