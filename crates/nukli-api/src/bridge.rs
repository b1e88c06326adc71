// Bridge HTTP client.
//
// Wraps `reqwest::Client` with the bridge's resource/query construction and
// the per-request authentication suffix. Every operation issues exactly one
// GET; retry policy belongs to the caller. The device tolerates a single
// concurrent connection, so all requests pass through a capacity-1 slot.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Authenticator, Encryption};
use crate::error::{Error, RequestInfo};
use crate::event::{ClientEvent, EVENT_CHANNEL_SIZE};
use crate::model::{BridgeIdentity, CallbackSubscription, firmware_from_value};
use crate::transport::TransportConfig;

const AUTH_RESOURCE: &str = "/auth";

/// Prefix for the derived bridge name used in logs and the callback
/// listener's diagnostic page.
pub const NAME_PREFIX: &str = "Nuki_Bridge_";

/// Constructor parameters for [`BridgeClient`].
///
/// `host` is a bare hostname or IP address; the port travels separately.
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub token: Option<SecretString>,
    pub encryption: Encryption,
    pub timeout: Duration,
}

impl BridgeConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 8080,
            token: None,
            encryption: Encryption::default(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Client for one bridge's REST surface.
///
/// Construction validates the configuration and fails fast with
/// [`Error::Config`] before any network I/O. The bridge identity (`id`,
/// firmware) is populated lazily by [`init`](Self::init).
pub struct BridgeClient {
    http: reqwest::Client,
    base: Url,
    host: String,
    port: u16,
    timeout: Duration,
    auth: Authenticator,
    identity: RwLock<Option<BridgeIdentity>>,
    seq: AtomicU64,
    /// Capacity-1 in-flight slot; requests against the same bridge serialize.
    slot: Mutex<()>,
    observe_tx: broadcast::Sender<ClientEvent>,
    event_tx: broadcast::Sender<Value>,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig) -> Result<Self, Error> {
        if config.host.is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if config.port == 0 {
            return Err(Error::config("port must be nonzero"));
        }
        let base = Url::parse(&format!("http://{}:{}/", config.host, config.port))
            .map_err(|e| Error::config(format!("invalid host {:?}: {e}", config.host)))?;
        if base.host_str().is_none() {
            return Err(Error::config(format!("invalid host {:?}", config.host)));
        }

        let transport = TransportConfig::new(config.timeout)?;
        let (observe_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            http: transport.build_client()?,
            base,
            host: config.host,
            port: config.port,
            timeout: config.timeout,
            auth: Authenticator::new(config.encryption, config.token),
            identity: RwLock::new(None),
            seq: AtomicU64::new(0),
            slot: Mutex::new(()),
            observe_tx,
            event_tx,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn encryption(&self) -> Encryption {
        self.auth.encryption()
    }

    pub fn has_token(&self) -> bool {
        self.auth.has_token()
    }

    /// Uppercase-hex bridge ID; `None` until [`init`](Self::init) has run.
    pub fn id(&self) -> Option<String> {
        self.identity
            .read()
            .expect("identity lock poisoned")
            .as_ref()
            .map(|identity| identity.id.clone())
    }

    /// Firmware version; `None` until [`init`](Self::init) has run.
    pub fn firmware(&self) -> Option<Vec<u32>> {
        self.identity
            .read()
            .expect("identity lock poisoned")
            .as_ref()
            .map(|identity| identity.firmware.clone())
    }

    /// Derived display name (`Nuki_Bridge_<id>`) for logs and listener
    /// registration; `None` until [`init`](Self::init) has run.
    pub fn name(&self) -> Option<String> {
        self.id().map(|id| format!("{NAME_PREFIX}{id}"))
    }

    // ── Observation channels ─────────────────────────────────────────

    /// Subscribe to per-request observation events.
    pub fn observe(&self) -> broadcast::Receiver<ClientEvent> {
        self.observe_tx.subscribe()
    }

    /// Subscribe to device events delivered through a callback listener.
    pub fn events(&self) -> broadcast::Receiver<Value> {
        self.event_tx.subscribe()
    }

    /// Handle used by the callback listener to deliver inbound events.
    pub fn event_sender(&self) -> broadcast::Sender<Value> {
        self.event_tx.clone()
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Obtain a token from the bridge.
    ///
    /// `/auth` is the one unauthenticated resource: the bridge hands out a
    /// token only while its button is pressed. `Ok(None)` means "button not
    /// yet pressed" and is expected to be retried externally with a long
    /// timeout. On success the new token replaces the client's credential.
    pub async fn auth(&self) -> Result<Option<String>, Error> {
        let body = self.get(AUTH_RESOURCE, &[]).await?;
        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(None);
        }
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("auth response carries no token".into()))?
            .to_owned();
        self.auth.set_token(SecretString::from(token.clone()));
        Ok(Some(token))
    }

    pub async fn info(&self) -> Result<Value, Error> {
        self.get("/info", &[]).await
    }

    /// List of paired devices with their last known states.
    pub async fn list(&self) -> Result<Value, Error> {
        self.get("/list", &[]).await
    }

    pub async fn log(&self) -> Result<Value, Error> {
        self.get("/log", &[]).await
    }

    pub async fn clearlog(&self) -> Result<Value, Error> {
        self.get("/clearlog", &[]).await
    }

    pub async fn reboot(&self) -> Result<Value, Error> {
        self.get("/reboot", &[]).await
    }

    /// Trigger a firmware update of the bridge and its paired devices.
    pub async fn fwupdate(&self) -> Result<Value, Error> {
        self.get("/fwupdate", &[]).await
    }

    /// Refresh and return the state of one paired device.
    pub async fn lock_state(&self, nuki_id: u64, device_type: u8) -> Result<Value, Error> {
        self.get(
            "/lockState",
            &[
                ("nukiId", nuki_id.to_string()),
                ("deviceType", device_type.to_string()),
            ],
        )
        .await
    }

    pub async fn lock(&self, nuki_id: u64, device_type: u8) -> Result<Value, Error> {
        self.get(
            "/lock",
            &[
                ("nukiId", nuki_id.to_string()),
                ("deviceType", device_type.to_string()),
            ],
        )
        .await
    }

    pub async fn unlock(&self, nuki_id: u64, device_type: u8) -> Result<Value, Error> {
        self.get(
            "/unlock",
            &[
                ("nukiId", nuki_id.to_string()),
                ("deviceType", device_type.to_string()),
            ],
        )
        .await
    }

    /// Send a raw action code to a paired device.
    ///
    /// The action range is validated by the caller layer; the code travels
    /// verbatim.
    pub async fn lock_action(
        &self,
        nuki_id: u64,
        device_type: u8,
        action: u8,
    ) -> Result<Value, Error> {
        self.get(
            "/lockAction",
            &[
                ("nukiId", nuki_id.to_string()),
                ("deviceType", device_type.to_string()),
                ("action", action.to_string()),
            ],
        )
        .await
    }

    /// Populate the bridge identity from `/info`. Idempotent; must run once
    /// before [`id`](Self::id) or [`name`](Self::name) return values.
    pub async fn init(&self) -> Result<(), Error> {
        if self
            .identity
            .read()
            .expect("identity lock poisoned")
            .is_some()
        {
            return Ok(());
        }
        let body = self.info().await?;
        let server_id = body
            .pointer("/ids/serverId")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Internal("info response carries no ids.serverId".into()))?;
        let firmware = body
            .pointer("/versions/firmwareVersion")
            .map(firmware_from_value)
            .unwrap_or_default();
        *self.identity.write().expect("identity lock poisoned") = Some(BridgeIdentity {
            id: format!("{server_id:X}"),
            firmware,
        });
        Ok(())
    }

    // ── Callback subscriptions ───────────────────────────────────────

    /// Register `url` as a callback subscription on the bridge.
    pub async fn callback_add(&self, url: &str) -> Result<Value, Error> {
        let encoded = urlencoding::encode(url).into_owned();
        self.get("/callback/add", &[("url", encoded)]).await
    }

    pub async fn callback_list(&self) -> Result<Value, Error> {
        self.get("/callback/list", &[]).await
    }

    /// Typed view of `/callback/list` for subscription management.
    pub async fn callbacks(&self) -> Result<Vec<CallbackSubscription>, Error> {
        let body = self.callback_list().await?;
        match body.get("callbacks") {
            Some(list) => serde_json::from_value(list.clone())
                .map_err(|e| Error::Internal(format!("unexpected callback list shape: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    pub async fn callback_remove(&self, id: u64) -> Result<Value, Error> {
        self.get("/callback/remove", &[("id", id.to_string())]).await
    }

    // ── Request mechanics ────────────────────────────────────────────

    async fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut resource_q = resource.to_owned();
        let mut separator = '?';
        for (name, value) in params {
            resource_q.push(separator);
            resource_q.push_str(name);
            resource_q.push('=');
            resource_q.push_str(value);
            separator = '&';
        }

        // Observation events carry the resource without the auth suffix so
        // subscribers can log them verbatim.
        let request = RequestInfo::new(id, resource_q.clone());
        let _ = self.observe_tx.send(ClientEvent::Request {
            id,
            method: request.method,
            resource: request.resource.clone(),
        });
        debug!(%request, host = %self.host, "sending");

        let authenticated = resource != AUTH_RESOURCE;
        match self
            .send(&request, resource_q, separator, authenticated)
            .await
        {
            Ok((status, body)) => {
                debug!(%request, status, "completed");
                let _ = self.observe_tx.send(ClientEvent::Response {
                    id,
                    status,
                    body: body.clone(),
                });
                Ok(body)
            }
            Err(err) => {
                warn!(%request, error = %err, "request failed");
                let _ = self.observe_tx.send(ClientEvent::Error {
                    id,
                    resource: request.resource,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn send(
        &self,
        request: &RequestInfo,
        mut resource_q: String,
        separator: char,
        authenticated: bool,
    ) -> Result<(u16, Value), Error> {
        if authenticated {
            let suffix = self.auth.query_suffix()?;
            resource_q.push(separator);
            resource_q.push_str(&suffix);
        }
        let url = self
            .base
            .join(&resource_q)
            .map_err(|e| Error::Internal(format!("invalid request URL: {e}")))?;

        let _slot = self.slot.lock().await;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(request, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport {
                request: request.clone(),
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(request, e))?;
        let value = serde_json::from_str(&body).map_err(|e| Error::Transport {
            request: request.clone(),
            status: Some(status.as_u16()),
            message: format!("undecodable JSON body: {e}"),
        })?;
        Ok((status.as_u16(), value))
    }

    fn transport_error(&self, request: &RequestInfo, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                request: request.clone(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport {
                request: request.clone(),
                status: err.status().map(|s| s.as_u16()),
                // The full URL would leak the auth suffix.
                message: err.without_url().to_string(),
            }
        }
    }
}
