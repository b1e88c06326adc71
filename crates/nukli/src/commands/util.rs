//! Shared helpers for command handlers.

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use nukli_api::ClientEvent;

/// Forward request/response/error observation events to tracing.
///
/// Runs until the observed client is dropped. Filtering happens at the
/// subscriber level (`-v` and up), so this is spawned unconditionally.
pub fn spawn_observer(mut events: broadcast::Receiver<ClientEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ClientEvent::Request {
                    id,
                    method,
                    resource,
                }) => debug!(id, "{method} {resource}"),
                Ok(ClientEvent::Response { id, status, body }) => {
                    debug!(id, status, "response");
                    trace!(id, %body, "response body");
                }
                Ok(ClientEvent::Error {
                    id,
                    resource,
                    message,
                }) => warn!(id, "{resource}: {message}"),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
