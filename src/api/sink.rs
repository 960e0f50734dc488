//! Where handlers write their responses.
//!
//! Handlers see a [`ResponseSink`]: a header map, a status code and a buffered body. Sinks that
//! can deliver a body incrementally additionally support [`ResponseSink::flush`] and hand out a
//! [`CloseNotifier`] that resolves once the client has gone away.
//!
//! [`HttpResponseWriter`] is the sink behind the axum server. The response head is handed to
//! the waiting axum handler either on the first flush (the body then streams from a channel)
//! or when the request finishes (the body is the buffered bytes).
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use super::Error;

/// Number of chunks queued towards the client before a flush waits.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// The client closed the connection.
#[derive(Debug, thiserror::Error)]
#[error("client connection closed")]
pub struct SinkClosed;

/// Resolves once the client has disconnected.
pub struct CloseNotifier(Pin<Box<dyn Future<Output = ()> + Send>>);

impl CloseNotifier {
    pub fn new(closed: impl Future<Output = ()> + Send + 'static) -> Self {
        Self(Box::pin(closed))
    }
}

impl Future for CloseNotifier {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for CloseNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseNotifier").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
pub trait ResponseSink: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn set_status(&mut self, status: StatusCode);

    /// Appends `data` to the buffered body.
    fn write(&mut self, data: &[u8]);

    fn supports_flush(&self) -> bool {
        false
    }

    /// Sends the head (if not sent yet) and everything buffered so far to the client.
    async fn flush(&mut self) -> Result<(), SinkClosed> {
        Ok(())
    }

    fn close_notifier(&self) -> Option<CloseNotifier> {
        None
    }
}

/// [`ResponseSink`] producing an axum [`Response`].
#[derive(Debug)]
pub struct HttpResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    buf: Vec<u8>,
    head_tx: Option<oneshot::Sender<Response>>,
    body_tx: mpsc::Sender<Bytes>,
    body_rx: Option<mpsc::Receiver<Bytes>>,
}

impl HttpResponseWriter {
    /// Creates a writer and the receiver its response head will be delivered to.
    pub fn new() -> (Self, oneshot::Receiver<Response>) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        let writer = Self {
            status: StatusCode::OK,
            headers: HeaderMap::default(),
            buf: Vec::default(),
            head_tx: Some(head_tx),
            body_tx,
            body_rx: Some(body_rx),
        };
        (writer, head_rx)
    }

    pub fn is_committed(&self) -> bool {
        self.head_tx.is_none()
    }

    /// Completes the response.
    ///
    /// An uncommitted response is sent with the buffered body; a streaming response gets its
    /// remaining bytes flushed and its body closed.
    pub async fn finish(mut self) {
        match self.head_tx.take() {
            Some(head_tx) => {
                let body = Body::from(std::mem::take(&mut self.buf));
                if head_tx.send(self.build_response(body)).is_err() {
                    log::debug!("client went away before the response was sent");
                }
            }
            None => {
                if let Err(err) = self.flush().await {
                    log::debug!("failed to flush final chunk: {}", err);
                }
            }
        }
    }

    /// Replaces the response with `err` as a plain-text 500, unless the head was already sent.
    pub fn fail(mut self, err: Error) {
        match self.head_tx.take() {
            Some(head_tx) => {
                if head_tx.send(err.into_response()).is_err() {
                    log::debug!("client went away before the error response was sent");
                }
            }
            None => log::error!("request failed after the response was committed: {}", err),
        }
    }

    fn build_response(&mut self, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        response
    }

    fn commit(&mut self) -> Result<(), SinkClosed> {
        let Some(head_tx) = self.head_tx.take() else {
            return Ok(());
        };
        let body_rx = self.body_rx.take().ok_or(SinkClosed)?;
        let stream = ReceiverStream::new(body_rx).map(Ok::<_, Infallible>);
        let response = self.build_response(Body::from_stream(stream));
        head_tx.send(response).map_err(|_| SinkClosed)
    }
}

#[async_trait::async_trait]
impl ResponseSink for HttpResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn supports_flush(&self) -> bool {
        true
    }

    async fn flush(&mut self) -> Result<(), SinkClosed> {
        self.commit()?;
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::take(&mut self.buf));
        self.body_tx.send(chunk).await.map_err(|_| SinkClosed)
    }

    fn close_notifier(&self) -> Option<CloseNotifier> {
        let body_tx = self.body_tx.clone();
        Some(CloseNotifier::new(async move { body_tx.closed().await }))
    }
}


#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;

    #[tokio::test]
    async fn test_finish_sends_buffered_response() {
        let (mut writer, head) = HttpResponseWriter::new();
        writer
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        writer.write(b"{}");
        writer.finish().await;

        let response = head.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{}");
    }

    #[tokio::test]
    async fn test_fail_before_commit_sends_error() {
        let (writer, head) = HttpResponseWriter::new();
        writer.fail(Error::UnsupportedVersion("v9".to_owned()));

        let response = head.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"unsupported API version "v9""#);
    }

    #[tokio::test]
    async fn test_flush_streams_chunks() {
        let (mut writer, head) = HttpResponseWriter::new();
        writer.set_status(StatusCode::ACCEPTED);
        writer.flush().await.unwrap();
        assert!(writer.is_committed());

        let response = head.await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let mut body = response.into_body().into_data_stream();

        writer.write(b"first\n");
        writer.flush().await.unwrap();
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"first\n");

        writer.write(b"second\n");
        writer.finish().await;
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"second\n");
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_notifier_fires_when_body_dropped() {
        let (mut writer, head) = HttpResponseWriter::new();
        let closed = writer.close_notifier().unwrap();
        writer.flush().await.unwrap();

        drop(head.await.unwrap());
        closed.await;
        writer.write(b"late");
        assert!(writer.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_flush_after_client_left_before_head() {
        let (mut writer, head) = HttpResponseWriter::new();
        drop(head);
        assert!(writer.flush().await.is_err());
    }
}
