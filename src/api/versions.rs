//! The concrete API versions.
//!
//! Every version serves the request types of its predecessor and adds its own:
//!
//! | version | adds |
//! |---------|------|
//! | `v1.0`  | `containers`, `machine` |
//! | `v1.1`  | `subcontainers` |
//! | `v1.2`  | `events` |
use axum::http::{HeaderValue, header};

use super::query::event_request_from_query;
use super::registry::VersionHandler;
use super::sink::ResponseSink;
use super::stream::stream_events;
use super::{ApiRequest, Error, Result};
use crate::info::ContainerInfoRequest;
use crate::manager::Manager;

const CONTAINERS: &str = "containers";
const MACHINE: &str = "machine";
const SUBCONTAINERS: &str = "subcontainers";
const EVENTS: &str = "events";

/// Handlers for every supported API version.
pub fn supported_versions() -> Vec<Box<dyn VersionHandler>> {
    vec![
        Box::new(Version1_0),
        Box::new(Version1_1::default()),
        Box::new(Version1_2::default()),
    ]
}

#[derive(Debug, Default)]
pub struct Version1_0;

#[async_trait::async_trait]
impl VersionHandler for Version1_0 {
    fn version(&self) -> &'static str {
        "v1.0"
    }

    fn supported_request_types(&self) -> Vec<&'static str> {
        vec![CONTAINERS, MACHINE]
    }

    async fn handle_request(
        &self,
        request_type: &str,
        args: &[String],
        manager: &dyn Manager,
        request: &ApiRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        match request_type {
            MACHINE => {
                let machine = manager.machine_info()?;
                write_result(&machine, sink)
            }
            CONTAINERS => {
                let name = container_name(args);
                let query = container_info_request(&request.body)?;
                let info = manager.container_info(&name, &query)?;
                write_result(&info, sink)
            }
            _ => Err(Error::UnknownRequestType(request_type.to_owned())),
        }
    }
}

#[derive(Debug, Default)]
pub struct Version1_1 {
    base: Version1_0,
}

#[async_trait::async_trait]
impl VersionHandler for Version1_1 {
    fn version(&self) -> &'static str {
        "v1.1"
    }

    fn supported_request_types(&self) -> Vec<&'static str> {
        let mut types = self.base.supported_request_types();
        types.push(SUBCONTAINERS);
        types
    }

    async fn handle_request(
        &self,
        request_type: &str,
        args: &[String],
        manager: &dyn Manager,
        request: &ApiRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        match request_type {
            SUBCONTAINERS => {
                let name = container_name(args);
                let query = container_info_request(&request.body)?;
                let infos = manager.subcontainers_info(&name, &query)?;
                write_result(&infos, sink)
            }
            _ => {
                self.base
                    .handle_request(request_type, args, manager, request, sink)
                    .await
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Version1_2 {
    base: Version1_1,
}

#[async_trait::async_trait]
impl VersionHandler for Version1_2 {
    fn version(&self) -> &'static str {
        "v1.2"
    }

    fn supported_request_types(&self) -> Vec<&'static str> {
        let mut types = self.base.supported_request_types();
        types.push(EVENTS);
        types
    }

    async fn handle_request(
        &self,
        request_type: &str,
        args: &[String],
        manager: &dyn Manager,
        request: &ApiRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        match request_type {
            EVENTS => {
                let (mut query, historical) = event_request_from_query(&request.query);
                query.container_name = container_name(args);
                if historical {
                    let events = manager.past_events(&query)?;
                    write_result(&events, sink)
                } else {
                    stream_events(&query, manager, sink).await
                }
            }
            _ => {
                self.base
                    .handle_request(request_type, args, manager, request, sink)
                    .await
            }
        }
    }
}

/// Serializes `result` as the JSON body of the response.
fn write_result<T: serde::Serialize + ?Sized>(
    result: &T,
    sink: &mut dyn ResponseSink,
) -> Result<()> {
    let out = serde_json::to_vec(result).map_err(Error::Encode)?;
    sink.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    sink.write(&out);
    Ok(())
}

/// Decodes the optional JSON body of a container info request.
///
/// An empty body selects the defaults.
fn container_info_request(body: &[u8]) -> Result<ContainerInfoRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ContainerInfoRequest::default());
    }
    serde_json::from_slice(body).map_err(Error::BodyDecode)
}

/// Joins `args` into an absolute, lexically cleaned container name.
fn container_name(args: &[String]) -> String {
    let mut segments: Vec<&str> = Vec::with_capacity(args.len());
    for segment in args.iter().flat_map(|arg| arg.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}
