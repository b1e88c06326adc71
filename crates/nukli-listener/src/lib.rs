// nukli-listener: local HTTP server receiving bridge callback events.
//
// Bridges push device events by POSTing JSON to a subscribed URL. The
// listener serves one such URL per registered client
// (`/notify/<bridge-id>`), demultiplexes inbound events onto the matching
// client's event channel, and keeps a diagnostic page at `/notify`.
//
// Lifecycle: the server binds lazily when the first client registers and
// closes when the last one leaves; a later registration re-binds, possibly
// on a different ephemeral port.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::{Arc, RwLock};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use nukli_api::BridgeClient;

/// Channel capacity for listener lifecycle events.
const EVENT_CHANNEL_SIZE: usize = 16;

// ── Errors & events ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The client has no identity yet; `BridgeClient::init` must run before
    /// it can register.
    #[error("client has no bridge identity yet (init must run first)")]
    ClientNotInitialized,

    #[error("failed to bind callback listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Out-of-band listener notifications.
///
/// Inbound HTTP transactions never fail: handler problems surface here
/// while the response still completes.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// The server bound; carries the base callback URL.
    Listening(String),
    /// The server closed; carries the last-known base callback URL.
    Close(String),
    /// A per-request handler failure (e.g. an undecodable event body).
    Error(String),
}

// ── Registry ────────────────────────────────────────────────────────

#[derive(Clone)]
struct Registration {
    name: String,
    /// The bridge's address, shown on the diagnostic page.
    remote_addr: String,
    /// The advertised callback address for this client.
    local_addr: String,
    events: broadcast::Sender<Value>,
}

struct Shared {
    /// Single source of truth, keyed by bridge ID. Name-sorted views are
    /// computed on demand.
    clients: RwLock<HashMap<String, Registration>>,
    events: broadcast::Sender<ListenerEvent>,
    server: Mutex<Option<ServerHandle>>,
}

struct ServerHandle {
    port: u16,
    base_url: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

// ── Listener ────────────────────────────────────────────────────────

/// HTTP server routing bridge callback events to registered clients.
pub struct CallbackListener {
    preferred_port: u16,
    shared: Arc<Shared>,
}

impl Default for CallbackListener {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CallbackListener {
    /// `port` 0 asks the OS for an ephemeral port.
    pub fn new(port: u16) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            preferred_port: port,
            shared: Arc::new(Shared {
                clients: RwLock::new(HashMap::new()),
                events,
                server: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to lifecycle and error notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ListenerEvent> {
        self.shared.events.subscribe()
    }

    /// The bound port, when listening.
    pub async fn port(&self) -> Option<u16> {
        self.shared.server.lock().await.as_ref().map(|s| s.port)
    }

    /// Register a client and return the callback URL to subscribe on its
    /// bridge. Binds the server on first registration.
    ///
    /// The advertised address is the local interface facing the bridge, so
    /// the URL is reachable from the bridge's network.
    pub async fn add_client(&self, client: &BridgeClient) -> Result<String, ListenerError> {
        let id = client.id().ok_or(ListenerError::ClientNotInitialized)?;
        let name = client.name().ok_or(ListenerError::ClientNotInitialized)?;

        let port = self.ensure_listening().await?;
        let ip = callback_ip(client.host(), client.port());
        let local_addr = format!("{ip}:{port}");

        self.shared
            .clients
            .write()
            .expect("client registry lock poisoned")
            .insert(
                id.clone(),
                Registration {
                    name: name.clone(),
                    remote_addr: format!("{}:{}", client.host(), client.port()),
                    local_addr: local_addr.clone(),
                    events: client.event_sender(),
                },
            );
        info!(client = %name, "registered callback client");

        Ok(format!("http://{local_addr}/notify/{id}"))
    }

    /// Deregister a client; closes the server when the registry empties.
    pub async fn remove_client(&self, client: &BridgeClient) -> Result<(), ListenerError> {
        let id = client.id().ok_or(ListenerError::ClientNotInitialized)?;
        let now_empty = {
            let mut clients = self
                .shared
                .clients
                .write()
                .expect("client registry lock poisoned");
            clients.remove(&id);
            clients.is_empty()
        };
        if now_empty {
            self.close().await;
        }
        Ok(())
    }

    async fn ensure_listening(&self) -> Result<u16, ListenerError> {
        let mut server = self.shared.server.lock().await;
        if let Some(handle) = server.as_ref() {
            return Ok(handle.port);
        }

        let listener =
            tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.preferred_port)).await?;
        let addr = listener.local_addr()?;
        let base_url = format!("http://{}:{}/notify", addr.ip(), addr.port());

        let router = router(Arc::clone(&self.shared));
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
            if let Err(err) = serve.await {
                warn!(error = %err, "callback listener terminated");
            }
        });

        info!(url = %base_url, "callback listener bound");
        let _ = self.shared.events.send(ListenerEvent::Listening(base_url.clone()));

        let port = addr.port();
        *server = Some(ServerHandle {
            port,
            base_url,
            shutdown,
            task,
        });
        Ok(port)
    }

    async fn close(&self) {
        let handle = self.shared.server.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(());
            let _ = handle.task.await;
            info!(url = %handle.base_url, "callback listener closed");
            let _ = self.shared.events.send(ListenerEvent::Close(handle.base_url));
        }
    }
}

/// The local interface address facing `host`, discovered by a UDP route
/// probe (no packet is sent). Falls back to generic local-IP detection.
fn callback_ip(host: &str, port: u16) -> IpAddr {
    let route_probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((host, port))?;
        Ok(socket.local_addr()?.ip())
    };
    route_probe().unwrap_or_else(|_| {
        local_ip_address::local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    })
}

// ── HTTP surface ────────────────────────────────────────────────────

fn router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/notify", get(diagnostic_page))
        .route("/notify/{id}", post(deliver_event))
        // Anything outside /notify is a silent no-op, still 200.
        .fallback(|| async { StatusCode::OK })
        .with_state(shared)
}

/// `GET /notify` -- an HTML table of registered clients, for checking from
/// a browser on the bridge's network that the listener is reachable.
async fn diagnostic_page(State(shared): State<Arc<Shared>>) -> Html<String> {
    let mut rows: Vec<Registration> = shared
        .clients
        .read()
        .expect("client registry lock poisoned")
        .values()
        .cloned()
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    let mut page = String::from("<table>");
    page.push_str(&format!(
        "<caption><h3>Listening to {} clients</h3></caption>",
        rows.len()
    ));
    page.push_str(
        "<tr><th scope=\"col\">Nuki Bridge</th>\
         <th scope=\"col\">IP Address</th>\
         <th scope=\"col\">Local IP Address</th>",
    );
    for row in rows {
        page.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.name, row.remote_addr, row.local_addr
        ));
    }
    page.push_str("</table>");
    Html(page)
}

/// `POST /notify/{id}` -- decode the event body and hand it to the matching
/// client. Unknown IDs are silently ignored; undecodable bodies become an
/// error notification. The response is always 200 with an empty body.
async fn deliver_event(
    State(shared): State<Arc<Shared>>,
    Path(id): Path<String>,
    body: Bytes,
) -> StatusCode {
    match serde_json::from_slice::<Value>(&body) {
        Ok(event) => {
            let target = shared
                .clients
                .read()
                .expect("client registry lock poisoned")
                .get(&id)
                .map(|registration| registration.events.clone());
            if let Some(events) = target {
                debug!(client = %id, "delivering callback event");
                let _ = events.send(event);
            } else {
                debug!(client = %id, "callback event for unknown client dropped");
            }
        }
        Err(err) => {
            let _ = shared
                .events
                .send(ListenerEvent::Error(format!(
                    "undecodable callback body for {id}: {err}"
                )));
        }
    }
    StatusCode::OK
}
