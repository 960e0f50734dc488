use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::manager;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("incomplete API request {0:?}")]
    IncompletePrefix(String),
    #[error("malformed request {0:?}")]
    MalformedRequest(String),
    #[error("unsupported API version {0:?}")]
    UnsupportedVersion(String),
    #[error("unknown request type {0:?}")]
    UnknownRequestType(String),
    #[error("could not access {0}")]
    CapabilityUnavailable(&'static str),
    #[error("unable to decode the json value: {0}")]
    BodyDecode(#[source] serde_json::Error),
    #[error("failed to marshal response: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to encode event for result stream: {0}")]
    EncodeEvent(#[source] serde_json::Error),
    #[error(transparent)]
    Manager(#[from] manager::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
