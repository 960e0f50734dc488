use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;
use time::OffsetDateTime;

use super::{Error, Manager, Result};
use crate::events::{Event, EventChannel, EventHub, EventRequest, EventType, WatchId};
use crate::info::{ContainerInfo, ContainerInfoRequest, ContainerStats};
use crate::machine::MachineInfo;

#[derive(Debug, Default)]
struct ContainerRecord {
    labels: HashMap<String, String>,
    stats: VecDeque<ContainerStats>,
}

/// Keeps containers, their recent stats samples and events in memory.
///
/// The server only registers the root container. [`add_container`], [`remove_container`],
/// [`record_stats`] and [`record_oom`] are the entry points for discovery and collection
/// components that feed the manager from outside the API.
///
/// [`add_container`]: InMemoryManager::add_container
/// [`remove_container`]: InMemoryManager::remove_container
/// [`record_stats`]: InMemoryManager::record_stats
/// [`record_oom`]: InMemoryManager::record_oom
#[derive(Debug)]
pub struct InMemoryManager {
    machine: MachineInfo,
    containers: DashMap<String, ContainerRecord>,
    events: EventHub,
    stats_capacity: usize,
}

impl InMemoryManager {
    pub fn new(machine: MachineInfo, event_history: usize, stats_history: usize) -> Self {
        Self {
            machine,
            containers: DashMap::default(),
            events: EventHub::new(event_history),
            stats_capacity: stats_history,
        }
    }

    /// Number of event watches currently registered.
    pub fn watch_count(&self) -> usize {
        self.events.watch_count()
    }

    /// Starts tracking a container and emits a creation event.
    ///
    /// Returns `false` if the container was already tracked; its labels are replaced in that
    /// case and no event is emitted.
    pub fn add_container(&self, name: impl Into<String>, labels: HashMap<String, String>) -> bool {
        let name = name.into();
        let created = match self.containers.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                entry.get_mut().labels = labels;
                false
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(ContainerRecord {
                    labels,
                    stats: VecDeque::default(),
                });
                true
            }
        };
        if created {
            log::debug!("Tracking container `{}`", name);
            self.emit(name, EventType::ContainerCreation);
        }
        created
    }

    /// Stops tracking a container and emits a deletion event.
    pub fn remove_container(&self, name: &str) -> Result<()> {
        self.containers
            .remove(name)
            .ok_or_else(|| Error::UnknownContainer(name.to_owned()))?;
        log::debug!("Stopped tracking container `{}`", name);
        self.emit(name.to_owned(), EventType::ContainerDeletion);
        Ok(())
    }

    pub fn record_stats(&self, name: &str, stats: ContainerStats) -> Result<()> {
        let mut record = self
            .containers
            .get_mut(name)
            .ok_or_else(|| Error::UnknownContainer(name.to_owned()))?;
        if self.stats_capacity == 0 {
            return Ok(());
        }
        if record.stats.len() == self.stats_capacity {
            record.stats.pop_front();
        }
        record.stats.push_back(stats);
        Ok(())
    }

    pub fn record_oom(&self, name: &str) -> Result<()> {
        if !self.containers.contains_key(name) {
            return Err(Error::UnknownContainer(name.to_owned()));
        }
        log::warn!("Container `{}` ran out of memory", name);
        self.emit(name.to_owned(), EventType::Oom);
        Ok(())
    }

    pub fn add_event(&self, event: Event) {
        self.events.add_event(event);
    }

    fn emit(&self, container_name: String, event_type: EventType) {
        self.events.add_event(Event::new(
            container_name,
            OffsetDateTime::now_utc(),
            event_type,
        ));
    }

    fn children_of(&self, name: &str) -> Vec<String> {
        let mut children: Vec<String> = self
            .containers
            .iter()
            .filter(|entry| entry.key() != name && parent_of(entry.key()) == name)
            .map(|entry| entry.key().clone())
            .collect();
        children.sort();
        children
    }

    fn info_for(&self, name: &str, query: &ContainerInfoRequest) -> Result<ContainerInfo> {
        let (labels, stats) = {
            let record = self
                .containers
                .get(name)
                .ok_or_else(|| Error::UnknownContainer(name.to_owned()))?;
            (record.labels.clone(), select_stats(&record.stats, query))
        };

        Ok(ContainerInfo {
            name: name.to_owned(),
            labels,
            subcontainers: self.children_of(name),
            stats,
        })
    }
}

impl Manager for InMemoryManager {
    fn machine_info(&self) -> Result<MachineInfo> {
        Ok(self.machine.clone())
    }

    fn container_info(&self, name: &str, query: &ContainerInfoRequest) -> Result<ContainerInfo> {
        self.info_for(name, query)
    }

    fn subcontainers_info(
        &self,
        name: &str,
        query: &ContainerInfoRequest,
    ) -> Result<Vec<ContainerInfo>> {
        if !self.containers.contains_key(name) {
            return Err(Error::UnknownContainer(name.to_owned()));
        }
        let mut names: Vec<String> = self
            .containers
            .iter()
            .filter(|entry| is_same_or_descendant(entry.key(), name))
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            match self.info_for(&name, query) {
                Ok(info) => out.push(info),
                // removed concurrently
                Err(Error::UnknownContainer(_)) => continue,
            }
        }
        Ok(out)
    }

    fn watch_for_events(&self, request: &EventRequest) -> Result<EventChannel> {
        Ok(self.events.watch(request.clone()))
    }

    fn past_events(&self, request: &EventRequest) -> Result<Vec<Event>> {
        Ok(self.events.past_events(request))
    }

    fn close_event_channel(&self, watch_id: WatchId) {
        self.events.stop_watch(watch_id);
    }
}

fn parent_of(name: &str) -> &str {
    match name.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn is_same_or_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate == ancestor
        || ancestor == "/"
        || candidate
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Picks the most recent `num_stats` samples within the requested time range, oldest first.
fn select_stats(
    stats: &VecDeque<ContainerStats>,
    query: &ContainerInfoRequest,
) -> Vec<ContainerStats> {
    let mut selected: Vec<ContainerStats> = stats
        .iter()
        .filter(|s| query.start.is_none_or(|start| s.timestamp >= start))
        .filter(|s| query.end.is_none_or(|end| s.timestamp <= end))
        .cloned()
        .collect();
    if selected.len() > query.num_stats {
        selected.drain(..selected.len() - query.num_stats);
    }
    selected
}
