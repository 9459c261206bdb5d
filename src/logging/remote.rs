//! Fire-and-forget delivery of entries to a remote collector.
//!
//! Delivery never blocks the caller and never reports failure back to it.
//! A transport may offer a beacon: a non-blocking hand-off to a queue that
//! outlives the caller. Otherwise the entry is POSTed from a detached task.
use crate::error::{Result, TelemetryError};
use crate::types::LogEntry;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Target for the crate's own delivery diagnostics.
pub const REMOTE_TARGET: &str = "site_telemetry::remote";

/// Beacons waiting for the delivery worker; further entries are dropped.
const BEACON_QUEUE_CAPACITY: usize = 256;

/// A way of moving one serialized entry to the collector.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queues `body` without blocking. Returns `false` when no beacon is
    /// available, in which case the caller falls back to `post`.
    fn beacon(&self, _endpoint: &str, _body: &str) -> bool {
        false
    }

    /// Sends `body` as a JSON POST.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the collector rejects it.
    async fn post(&self, endpoint: &str, body: String) -> Result<()>;
}

struct Beacon {
    endpoint: String,
    body: String,
}

/// `Transport` backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    beacon_tx: Option<mpsc::Sender<Beacon>>,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            beacon_tx: None,
        })
    }

    /// Starts a bounded background queue that delivers beacons independently
    /// of the code that queued them.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` when called outside a Tokio runtime.
    pub fn start_beacon_queue(&mut self) -> Result<()> {
        let handle = Handle::try_current().map_err(|_| TelemetryError::NoRuntime)?;
        let (tx, mut rx) = mpsc::channel::<Beacon>(BEACON_QUEUE_CAPACITY);
        let client = self.client.clone();

        handle.spawn(async move {
            while let Some(beacon) = rx.recv().await {
                if let Err(err) = post_json(&client, &beacon.endpoint, beacon.body).await {
                    tracing::warn!(target: REMOTE_TARGET, endpoint = %beacon.endpoint, "Remote logging failed: {}", err);
                }
            }
        });

        self.beacon_tx = Some(tx);
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// A full queue drops the entry rather than falling back to a post, so
    /// a slow collector cannot pile up work.
    fn beacon(&self, endpoint: &str, body: &str) -> bool {
        let Some(tx) = &self.beacon_tx else {
            return false;
        };
        let beacon = Beacon {
            endpoint: endpoint.to_string(),
            body: body.to_string(),
        };
        match tx.try_send(beacon) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(target: REMOTE_TARGET, "Beacon queue full, entry dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    async fn post(&self, endpoint: &str, body: String) -> Result<()> {
        post_json(&self.client, endpoint, body).await
    }
}

async fn post_json(client: &reqwest::Client, endpoint: &str, body: String) -> Result<()> {
    let response = client
        .post(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(TelemetryError::Transport(format!(
            "collector responded with {}",
            response.status()
        )));
    }
    Ok(())
}

/// Forwards entries to a collector when enabled.
pub struct RemoteSink {
    endpoint: String,
    transport: Option<Arc<dyn Transport>>,
}

impl RemoteSink {
    pub fn disabled() -> Self {
        Self {
            endpoint: String::new(),
            transport: None,
        }
    }

    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: Some(transport),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Hands the entry off for delivery. Failures are dropped.
    pub fn send(&self, entry: &LogEntry) {
        let Some(transport) = &self.transport else {
            return;
        };
        if let Err(err) = self.dispatch(transport, entry) {
            tracing::debug!(target: REMOTE_TARGET, "Remote log entry dropped: {}", err);
        }
    }

    fn dispatch(&self, transport: &Arc<dyn Transport>, entry: &LogEntry) -> Result<()> {
        let body = serde_json::to_string(entry)?;
        if transport.beacon(&self.endpoint, &body) {
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| TelemetryError::NoRuntime)?;
        let transport = Arc::clone(transport);
        let endpoint = self.endpoint.clone();
        handle.spawn(async move {
            if let Err(err) = transport.post(&endpoint, body).await {
                tracing::warn!(target: REMOTE_TARGET, endpoint = %endpoint, "Remote logging failed: {}", err);
            }
        });
        Ok(())
    }
}
