use std::collections::HashMap;

use super::sink::ResponseSink;
use super::{ApiRequest, Result};
use crate::manager::Manager;

/// Serves the request types of one API version.
#[async_trait::async_trait]
pub trait VersionHandler: Send + Sync {
    /// The version string clients put into the path, e.g. `v1.0`.
    fn version(&self) -> &'static str;

    fn supported_request_types(&self) -> Vec<&'static str>;

    /// Handles `request_type` with the positional `args` that followed it in the path.
    async fn handle_request(
        &self,
        request_type: &str,
        args: &[String],
        manager: &dyn Manager,
        request: &ApiRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<()>;
}

/// The API versions served by this process, keyed by version string.
pub struct VersionRegistry {
    handlers: HashMap<&'static str, Box<dyn VersionHandler>>,
}

impl VersionRegistry {
    pub fn new(handlers: impl IntoIterator<Item = Box<dyn VersionHandler>>) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|handler| (handler.version(), handler))
            .collect();
        Self { handlers }
    }

    pub fn resolve(&self, version: &str) -> Option<&dyn VersionHandler> {
        self.handlers.get(version).map(|handler| handler.as_ref())
    }

    /// All registered versions in ascending order.
    pub fn versions(&self) -> Vec<&'static str> {
        let mut versions: Vec<&'static str> = self.handlers.keys().copied().collect();
        versions.sort_unstable();
        versions
    }
}

impl std::fmt::Debug for VersionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}
