// Request/response observation events.
//
// Every bridge or directory call emits a `Request` event before the GET is
// sent and either a `Response` or an `Error` event afterwards. Events are
// fanned out on a `tokio::sync::broadcast` channel: sending never blocks and
// a send with no subscribers is silently dropped, so observation can never
// fail the underlying operation.

use serde_json::Value;

/// Channel capacity for observation events. Subscribers that fall this far
/// behind start seeing `RecvError::Lagged`.
pub(crate) const EVENT_CHANNEL_SIZE: usize = 64;

/// Observation event emitted by [`BridgeClient`](crate::BridgeClient) and
/// [`Discovery`](crate::Discovery).
///
/// `resource` is the path plus caller-supplied query parameters; the
/// authentication suffix is stripped so subscribers can log events verbatim.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Emitted before the request is sent.
    Request {
        id: u64,
        method: &'static str,
        resource: String,
    },
    /// Emitted when a 2xx response decoded successfully.
    Response { id: u64, status: u16, body: Value },
    /// Emitted when the call failed; carries the originating resource.
    Error {
        id: u64,
        resource: String,
        message: String,
    },
}

impl ClientEvent {
    /// Sequence number of the request this event belongs to.
    pub fn request_id(&self) -> u64 {
        match self {
            Self::Request { id, .. } | Self::Response { id, .. } | Self::Error { id, .. } => *id,
        }
    }
}
