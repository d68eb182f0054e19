//! Monitor service: owns the state and drives sampling, alerting and beacons.
//!
//! All ticks and host events are handled by one owner task. State lives
//! behind a single mutex and readers only ever see `Arc<MonitorSnapshot>`
//! copies published through a watch channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{MonitorError, Result};

use super::alerts::{self, AlertEvent};
use super::beacon::{BeaconDispatcher, BeaconSnapshot, DEFAULT_ENDPOINT_BASE, HEARTBEAT_EVENT};
use super::classifier::{classify, PressureThresholds};
use super::export::export_json;
use super::host::{EventSource, HostEvent, MetricsSource};
use super::reading::{Reading, ThermalState};
use super::store::{SampleStore, DEFAULT_MAX_READINGS};

/// Runtime settings for a [`MonitorService`]
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    pub beacon_interval: Duration,
    pub max_readings: usize,
    pub thresholds: PressureThresholds,
    /// Scheme and host the token is appended to
    pub endpoint_base: String,
    /// Empty disables beacons
    pub webhook_token: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(2),
            beacon_interval: Duration::from_secs(30),
            max_readings: DEFAULT_MAX_READINGS,
            thresholds: PressureThresholds::default(),
            endpoint_base: DEFAULT_ENDPOINT_BASE.to_string(),
            webhook_token: String::new(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            return Err(MonitorError::config("sample interval must be greater than zero"));
        }
        if self.beacon_interval.is_zero() {
            return Err(MonitorError::config("beacon interval must be greater than zero"));
        }
        if self.max_readings == 0 {
            return Err(MonitorError::config("max readings must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct MonitorState {
    store: SampleStore,
    /// 0 until the first start
    baseline_available_mb: f64,
    previous_available_mb: f64,
    is_running: bool,
    current_alert: Option<AlertEvent>,
}

/// Immutable copy of the monitor state handed to readers
#[derive(Debug, Clone, Default)]
pub struct MonitorSnapshot {
    /// Chronological, oldest first
    pub readings: Vec<Reading>,
    pub baseline_available_mb: f64,
    pub previous_available_mb: f64,
    pub is_running: bool,
    pub last_beacon_status: String,
    pub current_alert: Option<AlertEvent>,
}

impl MonitorSnapshot {
    pub fn count(&self) -> usize {
        self.readings.len()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// Last `n` readings, most recent first
    pub fn recent(&self, n: usize) -> Vec<Reading> {
        self.readings.iter().rev().take(n).cloned().collect()
    }

    pub fn export_json(&self) -> String {
        export_json(&self.readings)
    }
}

struct Engine {
    config: MonitorConfig,
    source: Arc<dyn MetricsSource>,
    dispatcher: Arc<BeaconDispatcher>,
    state: Mutex<MonitorState>,
    snapshot_tx: watch::Sender<Arc<MonitorSnapshot>>,
}

impl Engine {
    fn snapshot(&self) -> MonitorSnapshot {
        let state = self.state.lock();
        MonitorSnapshot {
            readings: state.store.export_all(),
            baseline_available_mb: state.baseline_available_mb,
            previous_available_mb: state.previous_available_mb,
            is_running: state.is_running,
            last_beacon_status: self.dispatcher.last_status(),
            current_alert: state.current_alert.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Arc::new(self.snapshot()));
    }

    /// Reset state for a fresh run. Returns false if already running.
    fn begin(&self) -> bool {
        let available = self.source.available_memory_mb();
        let mut state = self.state.lock();
        if state.is_running {
            return false;
        }

        state.store.clear();
        state.current_alert = None;
        state.baseline_available_mb = available;
        state.previous_available_mb = available;
        state.is_running = true;
        true
    }

    fn finish(&self) {
        self.state.lock().is_running = false;
        self.publish();
    }

    fn sample(&self) {
        let available = self.source.available_memory_mb();
        let total = self.source.physical_memory_mb();
        let thermal = self.source.thermal_state();

        let (reading, alert, baseline) = {
            let mut state = self.state.lock();
            let previous = state.previous_available_mb;
            let pressure = classify(
                available,
                previous,
                state.baseline_available_mb,
                &self.config.thresholds,
            );
            let reading = Reading::new(available, (total - available).max(0.0), thermal, pressure);
            let alert = alerts::evaluate(&reading, previous);

            state.store.record(reading.clone());
            // Always the immediately prior sample, alert or not
            state.previous_available_mb = available;
            if let Some(alert) = &alert {
                state.current_alert = Some(alert.clone());
            }
            (reading, alert, state.baseline_available_mb)
        };

        log::trace!(
            "Sampled {:.0} MB available ({})",
            reading.available_memory_mb,
            reading.pressure
        );
        self.publish();

        if let Some(alert) = alert {
            log::warn!("{}", alert.message);
            let snapshot = BeaconSnapshot {
                available_mb: reading.available_memory_mb,
                used_mb: reading.used_memory_mb,
                total_mb: total,
                thermal: reading.thermal_state,
                baseline_mb: baseline,
            };
            self.dispatcher.send(&snapshot, &alert.event_name(), true);
        }
    }

    fn heartbeat(&self) {
        let available = self.source.available_memory_mb();
        self.send_beacon(available, None, HEARTBEAT_EVENT, false);
    }

    fn handle_host_event(&self, event: HostEvent) {
        let available = self.source.available_memory_mb();
        let Some(alert) = alerts::evaluate_system_event(event, available) else {
            log::debug!("Ignoring host event {:?}", event);
            return;
        };

        log::warn!("{}", alert.message);
        let event_name = alert.event_name();
        self.state.lock().current_alert = Some(alert);
        self.publish();

        // The source may not have caught up with the state the event reports
        let thermal = match event {
            HostEvent::ThermalChanged(state) => Some(state),
            HostEvent::MemoryWarning => None,
        };
        self.send_beacon(available, thermal, &event_name, true);
    }

    fn send_beacon(
        &self,
        available: f64,
        thermal: Option<ThermalState>,
        event: &str,
        urgent: bool,
    ) {
        let total = self.source.physical_memory_mb();
        let snapshot = BeaconSnapshot {
            available_mb: available,
            used_mb: (total - available).max(0.0),
            total_mb: total,
            thermal: thermal.unwrap_or_else(|| self.source.thermal_state()),
            baseline_mb: self.state.lock().baseline_available_mb,
        };
        self.dispatcher.send(&snapshot, event, urgent);
    }
}

struct Worker {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Samples memory pressure on a timer, raises alerts and sends beacons.
///
/// States are stopped and running; `start` on a running service and `stop`
/// on a stopped one are no-ops. Each start captures a fresh baseline.
pub struct MonitorService {
    engine: Arc<Engine>,
    events: Arc<dyn EventSource>,
    worker: Option<Worker>,
}

impl MonitorService {
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn MetricsSource>,
        events: Arc<dyn EventSource>,
    ) -> Result<Self> {
        config.validate()?;

        let dispatcher = Arc::new(BeaconDispatcher::new(
            config.endpoint_base.clone(),
            config.webhook_token.clone(),
        )?);
        let state = MonitorState {
            store: SampleStore::with_capacity(config.max_readings),
            baseline_available_mb: 0.0,
            previous_available_mb: 0.0,
            is_running: false,
            current_alert: None,
        };
        let (snapshot_tx, _) = watch::channel(Arc::new(MonitorSnapshot::default()));

        Ok(Self {
            engine: Arc::new(Engine {
                config,
                source,
                dispatcher,
                state: Mutex::new(state),
                snapshot_tx,
            }),
            events,
            worker: None,
        })
    }

    /// Capture the baseline, take one sample, send one heartbeat and spawn
    /// the owner task. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MonitorError::runtime(format!("monitor needs a tokio runtime: {}", e)))?;

        if !self.engine.begin() {
            log::debug!("Monitor already running, start ignored");
            return Ok(());
        }

        let config = &self.engine.config;
        log::info!(
            "Monitor started (sample every {:?}, beacon every {:?}, keeping {} readings)",
            config.sample_interval,
            config.beacon_interval,
            config.max_readings
        );

        // Subscribed before the first beacon so its outcome is never missed
        let events = self.events.subscribe();
        let status_rx = self.engine.dispatcher.subscribe_status();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        self.engine.sample();
        self.engine.heartbeat();

        let handle = runtime.spawn(run_loop(
            Arc::clone(&self.engine),
            events,
            status_rx,
            shutdown_rx,
        ));
        self.worker = Some(Worker {
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Cancel both timers and drop the event subscription.
    ///
    /// Once this returns no further tick or event is processed. Beacons
    /// already in flight still complete and update the status.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = worker.shutdown_tx.send(());
        if let Err(e) = worker.handle.await {
            log::error!("Monitor task ended abnormally: {}", e);
        }

        self.engine.finish();
        log::info!("Monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.engine.state.lock().is_running
    }

    /// Change the webhook token; an empty token disables beacons.
    pub fn set_webhook_token(&self, token: impl Into<String>) {
        self.engine.dispatcher.set_token(token);
    }

    pub fn last_beacon_status(&self) -> String {
        self.engine.dispatcher.last_status()
    }

    /// Current state, copied.
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.engine.snapshot()
    }

    /// Receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MonitorSnapshot>> {
        self.engine.snapshot_tx.subscribe()
    }

    /// Full history as pretty JSON, oldest first.
    pub fn export_json(&self) -> String {
        let readings = self.engine.state.lock().store.export_all();
        export_json(&readings)
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown_tx.send(());
            worker.handle.abort();
        }
    }
}

async fn run_loop(
    engine: Arc<Engine>,
    mut events: broadcast::Receiver<HostEvent>,
    mut status_rx: watch::Receiver<String>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let sample_every = engine.config.sample_interval;
    let beacon_every = engine.config.beacon_interval;

    // First ticks land one period out; start already sampled and beaconed
    let mut sample_ticker = interval_at(Instant::now() + sample_every, sample_every);
    sample_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut beacon_ticker = interval_at(Instant::now() + beacon_every, beacon_every);
    beacon_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut events_open = true;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = sample_ticker.tick() => engine.sample(),
            _ = beacon_ticker.tick() => engine.heartbeat(),
            event = events.recv(), if events_open => match event {
                Ok(event) => engine.handle_host_event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Dropped {} host events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    log::debug!("Host event source closed");
                    events_open = false;
                }
            },
            Ok(()) = status_rx.changed() => engine.publish(),
        }
    }
}
