// Cloud directory discovery.
//
// The vendor's directory lists bridges that have phoned home from the local
// network's public address. A directory entry is only reported after a probe
// confirms the bridge actually answers on its LAN address; an unauthenticated
// probe yields HTTP 401, which still proves the bridge is alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, RequestInfo};
use crate::event::{ClientEvent, EVENT_CHANNEL_SIZE};
use crate::model::DiscoveredBridge;
use crate::transport::TransportConfig;

/// The vendor's fixed bridge directory endpoint.
pub const DIRECTORY_URL: &str = "https://api.nuki.io/discover/bridges";

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    #[serde(default)]
    bridges: Vec<DiscoveredBridge>,
}

/// Constructor parameters for [`Discovery`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub timeout: Duration,
    /// Directory endpoint; overridable for tests.
    pub directory: Url,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            directory: Url::parse(DIRECTORY_URL).expect("directory URL is well-formed"),
        }
    }
}

/// Queries the cloud directory and probes each candidate for reachability.
pub struct Discovery {
    http: reqwest::Client,
    directory: Url,
    seq: AtomicU64,
    observe_tx: broadcast::Sender<ClientEvent>,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig) -> Result<Self, Error> {
        let transport = TransportConfig::new(config.timeout)?;
        let (observe_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Ok(Self {
            http: transport.build_client()?,
            directory: config.directory,
            seq: AtomicU64::new(0),
            observe_tx,
        })
    }

    /// Subscribe to per-request observation events (directory and probes).
    pub fn observe(&self) -> broadcast::Receiver<ClientEvent> {
        self.observe_tx.subscribe()
    }

    /// Fetch the directory and return the entries that answered a probe,
    /// in directory order.
    ///
    /// An unreachable directory is a soft failure yielding an empty list;
    /// individual probe failures exclude their entry without aborting the
    /// sweep.
    pub async fn discover(&self) -> Vec<DiscoveredBridge> {
        let entries = match self.directory_entries().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "bridge directory unreachable");
                return Vec::new();
            }
        };

        // Probes run concurrently; join_all preserves directory order.
        let probes = entries
            .into_iter()
            .map(|bridge| async move { self.probe(&bridge).await.then_some(bridge) });
        join_all(probes).await.into_iter().flatten().collect()
    }

    async fn directory_entries(&self) -> Result<Vec<DiscoveredBridge>, Error> {
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let request = RequestInfo::new(id, self.directory.path().to_owned());
        let _ = self.observe_tx.send(ClientEvent::Request {
            id,
            method: request.method,
            resource: request.resource.clone(),
        });
        debug!(%request, "querying bridge directory");

        let outcome = self.fetch_directory(&request).await;
        match &outcome {
            Ok((status, body)) => {
                let _ = self.observe_tx.send(ClientEvent::Response {
                    id,
                    status: *status,
                    body: body.clone(),
                });
            }
            Err(err) => {
                let _ = self.observe_tx.send(ClientEvent::Error {
                    id,
                    resource: request.resource.clone(),
                    message: err.to_string(),
                });
            }
        }
        let (_, body) = outcome?;
        let directory: DirectoryResponse = serde_json::from_value(body).map_err(|e| {
            Error::Transport {
                request,
                status: None,
                message: format!("unexpected directory shape: {e}"),
            }
        })?;
        Ok(directory.bridges)
    }

    async fn fetch_directory(&self, request: &RequestInfo) -> Result<(u16, Value), Error> {
        let response = self
            .http
            .get(self.directory.clone())
            .send()
            .await
            .map_err(|e| Error::Transport {
                request: request.clone(),
                status: e.status().map(|s| s.as_u16()),
                message: e.without_url().to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport {
                request: request.clone(),
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }
        let body = response.json().await.map_err(|e| Error::Transport {
            request: request.clone(),
            status: Some(status.as_u16()),
            message: format!("undecodable JSON body: {e}"),
        })?;
        Ok((status.as_u16(), body))
    }

    /// `true` if the bridge answered `/info` at all. 200 and 401 both count:
    /// the probe carries no token, so a live bridge with token protection
    /// responds 401.
    async fn probe(&self, bridge: &DiscoveredBridge) -> bool {
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let Ok(url) = Url::parse(&format!("http://{}:{}/info", bridge.ip, bridge.port)) else {
            return false;
        };
        let resource = url.to_string();
        let _ = self.observe_tx.send(ClientEvent::Request {
            id,
            method: "GET",
            resource: resource.clone(),
        });
        debug!(request = %resource, "probing bridge");

        match self.http.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 || status == 401 {
                    let _ = self.observe_tx.send(ClientEvent::Response {
                        id,
                        status,
                        body: Value::Null,
                    });
                    true
                } else {
                    let _ = self.observe_tx.send(ClientEvent::Error {
                        id,
                        resource,
                        message: format!("HTTP {status}"),
                    });
                    false
                }
            }
            Err(err) => {
                let _ = self.observe_tx.send(ClientEvent::Error {
                    id,
                    resource,
                    message: err.without_url().to_string(),
                });
                false
            }
        }
    }
}
