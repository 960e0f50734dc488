use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{Event, EventRequest};

/// Number of undelivered events buffered per watch before new ones are dropped.
const WATCH_BUFFER_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a registered watch.
#[derive(Debug)]
pub struct EventChannel {
    watch_id: WatchId,
    rx: mpsc::Receiver<Event>,
}

impl EventChannel {
    pub fn new(watch_id: WatchId, rx: mpsc::Receiver<Event>) -> Self {
        Self { watch_id, rx }
    }

    pub fn watch_id(&self) -> WatchId {
        self.watch_id
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn into_parts(self) -> (WatchId, mpsc::Receiver<Event>) {
        (self.watch_id, self.rx)
    }
}

#[derive(Debug)]
struct Watcher {
    request: EventRequest,
    tx: mpsc::Sender<Event>,
}

/// Stores past events and relays new ones to every matching watch.
///
/// Delivery never blocks the producer. Each watch buffers up to 64 undelivered events; while
/// that buffer is full, new events for the watch are dropped (and logged at warn level) but
/// still recorded in the history, so a slow client can recover them through [`past_events`].
/// The watch itself stays registered until its receiver is dropped or it is stopped.
///
/// [`past_events`]: EventHub::past_events
#[derive(Debug)]
pub struct EventHub {
    next_watch_id: AtomicU64,
    watchers: DashMap<WatchId, Watcher>,
    history: Mutex<VecDeque<Event>>,
    history_capacity: usize,
}

impl EventHub {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            next_watch_id: AtomicU64::new(1),
            watchers: DashMap::default(),
            history: Mutex::new(VecDeque::with_capacity(history_capacity.min(1024))),
            history_capacity,
        }
    }

    /// Registers a watch for all future events matching `request`.
    pub fn watch(&self, request: EventRequest) -> EventChannel {
        let watch_id = WatchId(self.next_watch_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(WATCH_BUFFER_CAPACITY);
        log::debug!(
            "Registered watch {} for container `{}`",
            watch_id,
            request.container_name
        );
        self.watchers.insert(watch_id, Watcher { request, tx });
        EventChannel::new(watch_id, rx)
    }

    /// Unregisters a watch. Returns `false` if the watch was not registered.
    pub fn stop_watch(&self, watch_id: WatchId) -> bool {
        let removed = self.watchers.remove(&watch_id).is_some();
        if removed {
            log::debug!("Stopped watch {}", watch_id);
        }
        removed
    }

    pub fn watch_count(&self) -> usize {
        self.watchers.len()
    }

    /// Records `event` in the history and delivers it to every matching watch.
    pub fn add_event(&self, event: Event) {
        self.watchers.retain(|watch_id, watcher| {
            if !watcher.request.matches(&event) {
                return true;
            }
            match watcher.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(ev)) => {
                    log::warn!(
                        "dropping event for watch {}: buffer full (event={:?})",
                        watch_id,
                        ev
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Removing watch {} with closed receiver", watch_id);
                    false
                }
            }
        });

        if self.history_capacity == 0 {
            return;
        }
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == self.history_capacity {
            history.pop_front();
        }
        history.push_back(event);
    }

    /// Returns stored events matching `request` in chronological order.
    ///
    /// When `max_events_returned` is positive only the most recent events up to that count are
    /// returned.
    pub fn past_events(&self, request: &EventRequest) -> Vec<Event> {
        let mut events: Vec<Event> = {
            let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            history
                .iter()
                .filter(|ev| request.matches(ev))
                .cloned()
                .collect()
        };
        events.sort_by_key(|ev| ev.timestamp);
        if let Ok(max) = usize::try_from(request.max_events_returned) {
            if max > 0 && events.len() > max {
                events.drain(..events.len() - max);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::events::EventType;

    fn event_at(name: &str, timestamp: OffsetDateTime) -> Event {
        Event::new(name, timestamp, EventType::ContainerCreation)
    }

    #[tokio::test]
    async fn test_watch_receives_matching_events_in_order() {
        let hub = EventHub::new(10);
        let mut channel = hub.watch(EventRequest::default());
        let base = datetime!(2024-05-01 10:00 UTC);

        hub.add_event(event_at("/", base));
        hub.add_event(event_at("/other", base));
        hub.add_event(event_at("/", base + Duration::seconds(1)));

        assert_eq!(channel.recv().await.unwrap().timestamp, base);
        assert_eq!(
            channel.recv().await.unwrap().timestamp,
            base + Duration::seconds(1)
        );
        assert!(channel.rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_watch_unregisters_once() {
        let hub = EventHub::new(10);
        let channel = hub.watch(EventRequest::default());
        assert_eq!(hub.watch_count(), 1);
        assert!(hub.stop_watch(channel.watch_id()));
        assert!(!hub.stop_watch(channel.watch_id()));
        assert_eq!(hub.watch_count(), 0);
    }

    #[test]
    fn test_watch_ids_are_unique() {
        let hub = EventHub::new(0);
        let a = hub.watch(EventRequest::default());
        let b = hub.watch(EventRequest::default());
        assert_ne!(a.watch_id(), b.watch_id());
    }

    #[test]
    fn test_closed_watchers_are_pruned() {
        let hub = EventHub::new(0);
        drop(hub.watch(EventRequest::default()));
        assert_eq!(hub.watch_count(), 1);
        hub.add_event(event_at("/", datetime!(2024-05-01 10:00 UTC)));
        assert_eq!(hub.watch_count(), 0);
    }

    #[test]
    fn test_full_watch_drops_new_events_but_keeps_history() {
        let hub = EventHub::new(WATCH_BUFFER_CAPACITY + 1);
        let mut channel = hub.watch(EventRequest::default());
        let base = datetime!(2024-05-01 10:00 UTC);
        for i in 0..=WATCH_BUFFER_CAPACITY as i64 {
            hub.add_event(event_at("/", base + Duration::seconds(i)));
        }

        assert_eq!(hub.watch_count(), 1);
        let mut delivered = 0;
        while let Ok(ev) = channel.rx.try_recv() {
            assert_eq!(ev.timestamp, base + Duration::seconds(delivered));
            delivered += 1;
        }
        assert_eq!(delivered, WATCH_BUFFER_CAPACITY as i64);

        let request = EventRequest {
            max_events_returned: 1,
            ..Default::default()
        };
        let last = hub.past_events(&request);
        assert_eq!(
            last[0].timestamp,
            base + Duration::seconds(WATCH_BUFFER_CAPACITY as i64)
        );

        hub.add_event(event_at("/", base + Duration::seconds(100)));
        assert_eq!(
            channel.rx.try_recv().unwrap().timestamp,
            base + Duration::seconds(100)
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let hub = EventHub::new(2);
        let base = datetime!(2024-05-01 10:00 UTC);
        for i in 0..3 {
            hub.add_event(event_at("/", base + Duration::seconds(i)));
        }
        let request = EventRequest {
            max_events_returned: 0,
            ..Default::default()
        };
        let events = hub.past_events(&request);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, base + Duration::seconds(1));
    }

    #[test]
    fn test_past_events_sorted_and_limited_to_most_recent() {
        let hub = EventHub::new(10);
        let base = datetime!(2024-05-01 10:00 UTC);
        hub.add_event(event_at("/", base + Duration::seconds(2)));
        hub.add_event(event_at("/", base));
        hub.add_event(event_at("/", base + Duration::seconds(1)));

        let request = EventRequest {
            max_events_returned: 2,
            ..Default::default()
        };
        let timestamps: Vec<_> = hub
            .past_events(&request)
            .into_iter()
            .map(|ev| ev.timestamp)
            .collect();
        assert_eq!(
            timestamps,
            [base + Duration::seconds(1), base + Duration::seconds(2)]
        );
    }
}
