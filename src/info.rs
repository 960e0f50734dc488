//! Data types exchanged between the API and the manager.
use std::collections::HashMap;

use time::OffsetDateTime;

const DEFAULT_NUM_STATS: usize = 60;

/// Selects which stats samples a container info request returns.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ContainerInfoRequest {
    /// Maximum number of samples, most recent first.
    pub num_stats: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl Default for ContainerInfoRequest {
    fn default() -> Self {
        Self {
            num_stats: DEFAULT_NUM_STATS,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerInfo {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub subcontainers: Vec<String>,
    pub stats: Vec<ContainerStats>,
}

/// One resource usage sample of a container.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerStats {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub cpu_usage_usec: Option<u64>,
    pub cpu_user_usec: Option<u64>,
    pub cpu_system_usec: Option<u64>,
    pub memory_usage_bytes: Option<u64>,
    pub memory_limit_bytes: Option<u64>,
    pub io_rbytes: Option<u64>,
    pub io_wbytes: Option<u64>,
    pub net_rx_bytes: Option<u64>,
    pub net_tx_bytes: Option<u64>,
}

impl ContainerStats {
    /// Creates an empty sample taken at `timestamp`.
    pub fn at(timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp,
            cpu_usage_usec: None,
            cpu_user_usec: None,
            cpu_system_usec: None,
            memory_usage_bytes: None,
            memory_limit_bytes: None,
            io_rbytes: None,
            io_wbytes: None,
            net_rx_bytes: None,
            net_tx_bytes: None,
        }
    }
}
