use axum::http::{HeaderValue, StatusCode, header};

use super::sink::ResponseSink;
use super::{Error, Result};
use crate::error::ResultOkLogExt;
use crate::events::{Event, EventRequest, WatchId};
use crate::manager::Manager;

/// Unregisters a watch when dropped, so every exit path releases it exactly once.
struct WatchGuard<'a> {
    manager: &'a dyn Manager,
    watch_id: WatchId,
}

impl Drop for WatchGuard<'_> {
    fn drop(&mut self) {
        log::debug!("Closing event watch {}", self.watch_id);
        self.manager.close_event_channel(self.watch_id);
    }
}

/// Streams events matching `request` to the client as JSON lines until it disconnects.
///
/// The sink must support flushing and provide a close notifier; otherwise
/// [`Error::CapabilityUnavailable`] is returned before any watch is registered. Events are
/// written in the order they are received and every write is followed by a flush. An event that
/// fails to encode is logged and skipped.
///
/// A client disconnect ends the stream normally. The watch is unregistered before this returns.
pub async fn stream_events(
    request: &EventRequest,
    manager: &dyn Manager,
    sink: &mut dyn ResponseSink,
) -> Result<()> {
    let mut closed = sink
        .close_notifier()
        .ok_or(Error::CapabilityUnavailable("close notifier"))?;
    if !sink.supports_flush() {
        return Err(Error::CapabilityUnavailable("flusher"));
    }

    let (watch_id, mut events) = manager.watch_for_events(request)?.into_parts();
    let _watch = WatchGuard { manager, watch_id };

    sink.headers_mut()
        .insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    sink.set_status(StatusCode::OK);
    if sink.flush().await.is_err() {
        log::debug!("client of watch {} left before the stream opened", watch_id);
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = &mut closed => {
                log::trace!("Received close notification for watch {}", watch_id);
                return Ok(());
            }
            event = events.recv() => {
                let Some(event) = event else {
                    log::debug!("event source closed watch {}", watch_id);
                    return Ok(());
                };
                log::trace!("Received event from watch {}: {:?}", watch_id, event);
                if let Some(line) = encode_event(&event).ok_log() {
                    sink.write(&line);
                }
                if sink.flush().await.is_err() {
                    log::trace!("client of watch {} disconnected during flush", watch_id);
                    return Ok(());
                }
            }
        }
    }
}

/// Encodes `event` as a single JSON line.
fn encode_event(event: &Event) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(event).map_err(Error::EncodeEvent)?;
    line.push(b'\n');
    Ok(line)
}
