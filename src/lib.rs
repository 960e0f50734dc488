//! Creo API: the versioned HTTP front door of the Creo container monitor.
//!
//! Requests below `/api/` are routed to the handler of the API version named in the path.
//! Handlers answer with JSON documents about the machine and its containers, or stream
//! container events to the client until it disconnects.
use std::collections::HashMap;
use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod info;
pub mod machine;
pub mod manager;

/// Runs the API server.
///
/// Reads the [`config::Config`] from the environment, describes the host from the files below
/// the configured rootfs and serves all supported API versions until the server fails.
///
/// # Errors
///
/// Possible errors include:
/// - Malformed numeric environment variables (e.g., `CREO_EVENT_HISTORY`).
/// - Missing or invalid `etc/machine-id` below the rootfs.
/// - Failure to bind the listen address.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {:?}", config);

    let machine = machine::read_machine_info(&config.rootfs)?;
    log::debug!("Machine ID: {}", machine.machine_id);

    let manager = Arc::new(manager::InMemoryManager::new(
        machine,
        config.event_history,
        config.stats_history,
    ));
    manager.add_container("/", HashMap::default());

    let registry = api::VersionRegistry::new(api::versions::supported_versions());
    log::info!("Serving API versions {}", registry.versions().join(","));

    let server = api::APIServer::new(registry, manager);
    server.listen(config.listen_addr.as_str()).await?;

    Ok(())
}
