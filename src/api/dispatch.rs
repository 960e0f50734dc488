use std::time::Instant;

use super::path::{ApiPath, is_api_root, parse_request_path};
use super::registry::VersionRegistry;
use super::sink::ResponseSink;
use super::{ApiRequest, Error, Result};
use crate::manager::Manager;

/// Routes `request` to the handler of its API version.
///
/// Under-specified paths are answered with a discovery listing: the bare API root lists the
/// registered versions, a version without request type lists that version's request types.
/// Both listings are sorted. Errors returned by a version handler are passed through as-is.
pub async fn handle_request(
    registry: &VersionRegistry,
    manager: &dyn Manager,
    request: &ApiRequest,
    sink: &mut dyn ResponseSink,
) -> Result<()> {
    let start = Instant::now();
    let result = dispatch(registry, manager, request, sink).await;
    log::debug!("Request {} took {:?}", request.path, start.elapsed());
    result
}

async fn dispatch(
    registry: &VersionRegistry,
    manager: &dyn Manager,
    request: &ApiRequest,
    sink: &mut dyn ResponseSink,
) -> Result<()> {
    if is_api_root(&request.path) {
        write_version_listing(registry, sink);
        return Ok(());
    }

    let (version, parsed) = match parse_request_path(&request.path)? {
        ApiPath::Versions => {
            write_version_listing(registry, sink);
            return Ok(());
        }
        ApiPath::RequestTypes { version } => (version, None),
        ApiPath::Request(parsed) => (parsed.version.clone(), Some(parsed)),
    };

    let handler = registry
        .resolve(&version)
        .ok_or_else(|| Error::UnsupportedVersion(version.clone()))?;

    let Some(parsed) = parsed else {
        let mut request_types = handler.supported_request_types();
        request_types.sort_unstable();
        let listing = format!("Supported request types: {:?}", request_types.join(","));
        sink.write(listing.as_bytes());
        return Ok(());
    };

    handler
        .handle_request(&parsed.request_type, &parsed.args, manager, request, sink)
        .await
}

fn write_version_listing(registry: &VersionRegistry, sink: &mut dyn ResponseSink) {
    let listing = format!(
        "Supported API versions: {}",
        registry.versions().join(",")
    );
    sink.write(listing.as_bytes());
}
