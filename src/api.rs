use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tokio::net::ToSocketAddrs;

use crate::manager::Manager;

mod dispatch;
mod error;
mod path;
mod query;
mod registry;
mod sink;
mod stream;
pub mod versions;

pub use dispatch::handle_request;
pub use error::{Error, Result};
pub use path::{API_PREFIX, API_RESOURCE, ApiPath, ParsedRequest, parse_request_path};
pub use query::{QueryParams, apply_event_query, event_request_from_query};
pub use registry::{VersionHandler, VersionRegistry};
pub use sink::{CloseNotifier, HttpResponseWriter, ResponseSink, SinkClosed};
pub use stream::stream_events;

/// The parts of an inbound request the handlers look at.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub path: String,
    pub query: QueryParams,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>, raw_query: Option<&str>, body: Bytes) -> Self {
        Self {
            path: path.into(),
            query: QueryParams::parse(raw_query),
            body,
        }
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<VersionRegistry>,
    manager: Arc<dyn Manager>,
}

/// Runs the request on its own task and answers with the head it produces.
///
/// Streaming handlers keep running after the head was returned; they learn about the client
/// going away through the writer's close notifier.
async fn serve_api(State(state): State<AppState>, uri: Uri, body: Bytes) -> Response {
    let path = match decode_path(uri.path()) {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };
    let request = ApiRequest::new(path, uri.query(), body);
    let (mut writer, head) = HttpResponseWriter::new();
    tokio::spawn(async move {
        match handle_request(&state.registry, state.manager.as_ref(), &request, &mut writer).await
        {
            Ok(()) => writer.finish().await,
            Err(err) => {
                log::debug!("request {} failed: {}", request.path, err);
                writer.fail(err);
            }
        }
    });

    match head.await {
        Ok(response) => response,
        Err(_) => {
            log::error!("request handler ended without producing a response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Percent-decodes the request path; handlers route on the decoded form.
fn decode_path(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|path| path.into_owned())
        .map_err(|_| Error::MalformedRequest(raw.to_owned()))
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(registry: VersionRegistry, manager: Arc<dyn Manager>) -> Self {
        let state = AppState {
            registry: Arc::new(registry),
            manager,
        };
        // Every path reaches `serve_api`; paths outside the API are rejected by the dispatcher.
        let router = axum::Router::new().fallback(serve_api).with_state(state);
        Self { router }
    }

    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_path() {
        assert_eq!(
            decode_path("/api/v1%2E0/containers/my%20box").unwrap(),
            "/api/v1.0/containers/my box"
        );
        assert_eq!(decode_path("/api/v1.0/a+b").unwrap(), "/api/v1.0/a+b");
        assert!(matches!(
            decode_path("/api/v1.0/containers/%FF"),
            Err(Error::MalformedRequest(p)) if p == "/api/v1.0/containers/%FF"
        ));
    }
}
