//! Outbound status notifications ("beacons") to the configured webhook.
//!
//! Delivery is best effort: each send runs on its own tokio task, is never
//! retried, and only ever updates the last-status string. Overlapping sends
//! are independent, so the status reflects whichever finished last.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;

use super::reading::ThermalState;

pub const USER_AGENT: &str = "TCC-Monitor/1.0";
pub const DEFAULT_ENDPOINT_BASE: &str = "https://webhook.site";
pub const HEARTBEAT_EVENT: &str = "heartbeat";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Pin the uptime origin. Call early in `main`; otherwise the first beacon does.
pub fn mark_process_start() {
    Lazy::force(&PROCESS_START);
}

pub fn uptime_secs() -> u64 {
    PROCESS_START.elapsed().as_secs()
}

/// Memory figures a beacon reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeaconSnapshot {
    pub available_mb: f64,
    pub used_mb: f64,
    pub total_mb: f64,
    pub thermal: ThermalState,
    pub baseline_mb: f64,
}

/// JSON body POSTed to the webhook. Key names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconPayload {
    pub t: String,
    pub e: String,
    pub mem_avail_mb: i64,
    pub mem_used_mb: i64,
    pub mem_total_mb: i64,
    pub thermal: ThermalState,
    pub baseline_mb: i64,
    pub drop_from_baseline_mb: i64,
    pub urgent: bool,
    pub uptime_s: u64,
}

impl BeaconPayload {
    pub fn new(
        snapshot: &BeaconSnapshot,
        event: &str,
        urgent: bool,
        at: DateTime<Utc>,
        uptime_s: u64,
    ) -> Self {
        Self {
            t: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            e: event.to_string(),
            mem_avail_mb: snapshot.available_mb as i64,
            mem_used_mb: snapshot.used_mb as i64,
            mem_total_mb: snapshot.total_mb as i64,
            thermal: snapshot.thermal,
            baseline_mb: snapshot.baseline_mb as i64,
            drop_from_baseline_mb: (snapshot.baseline_mb - snapshot.available_mb) as i64,
            urgent,
            uptime_s,
        }
    }
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered { event: String, at: DateTime<Utc> },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// Human-readable form shown as the last beacon status.
    pub fn status_line(&self) -> String {
        match self {
            DeliveryOutcome::Delivered { event, at } => {
                format!("Sent {} at {}", event, at.format("%Y-%m-%d %H:%M:%S UTC"))
            }
            DeliveryOutcome::Failed { reason } => format!("Failed: {}", reason),
        }
    }
}

fn failure_reason(err: &dyn std::error::Error) -> String {
    let reason = err.to_string();
    if reason.trim().is_empty() {
        "unknown".to_string()
    } else {
        reason
    }
}

/// Serializes snapshots into [`BeaconPayload`]s and POSTs them to
/// `<endpoint_base>/<token>`.
pub struct BeaconDispatcher {
    client: reqwest::Client,
    endpoint_base: String,
    token: RwLock<String>,
    status_tx: watch::Sender<String>,
}

impl BeaconDispatcher {
    pub fn new(endpoint_base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (status_tx, _) = watch::channel(String::new());

        Ok(Self {
            client,
            endpoint_base: endpoint_base.into(),
            token: RwLock::new(token.into()),
            status_tx,
        })
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = token.into();
    }

    /// Webhook URL for the current token, `None` while delivery is disabled.
    pub fn endpoint(&self) -> Option<String> {
        let token = self.token.read();
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.endpoint_base.trim_end_matches('/'), token))
    }

    pub fn last_status(&self) -> String {
        self.status_tx.borrow().clone()
    }

    /// Receiver notified every time a delivery completes.
    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    /// Fire off a beacon without waiting for it.
    ///
    /// Returns `None` without touching the network or the status when no
    /// token is configured. Must be called from within a tokio runtime.
    pub fn send(
        self: &Arc<Self>,
        snapshot: &BeaconSnapshot,
        event: &str,
        urgent: bool,
    ) -> Option<JoinHandle<DeliveryOutcome>> {
        let Some(endpoint) = self.endpoint() else {
            log::trace!("No webhook token configured, skipping {} beacon", event);
            return None;
        };

        let payload = BeaconPayload::new(snapshot, event, urgent, Utc::now(), uptime_secs());
        let dispatcher = Arc::clone(self);

        Some(tokio::spawn(async move {
            let outcome = dispatcher.deliver(&endpoint, &payload).await;
            dispatcher.record(&outcome);
            outcome
        }))
    }

    /// POST one payload and report how it went. Never returns an error.
    pub async fn deliver(&self, endpoint: &str, payload: &BeaconPayload) -> DeliveryOutcome {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                return DeliveryOutcome::Failed {
                    reason: format!("serialization: {}", failure_reason(&e)),
                }
            }
        };

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == StatusCode::OK => DeliveryOutcome::Delivered {
                event: payload.e.clone(),
                at: Utc::now(),
            },
            Ok(resp) => DeliveryOutcome::Failed {
                reason: format!("HTTP {}", resp.status()),
            },
            Err(e) => DeliveryOutcome::Failed {
                reason: failure_reason(&e),
            },
        }
    }

    fn record(&self, outcome: &DeliveryOutcome) {
        let status = outcome.status_line();
        if outcome.is_delivered() {
            log::debug!("Beacon delivered: {}", status);
        } else {
            log::warn!("Beacon delivery failed: {}", status);
        }
        self.status_tx.send_replace(status);
    }
}
