//! Host event plumbing.
//!
//! [`ChannelEventSource`] is a broadcast emitter that implements the core's
//! `EventSource`. [`HostEventPoller`] feeds it on hosts that have no native
//! memory-warning or thermal notifications by polling a `MetricsSource`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::monitor::{EventSource, HostEvent, MetricsSource, ThermalState};

const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Broadcast emitter for host events
#[derive(Debug, Clone)]
pub struct ChannelEventSource {
    tx: broadcast::Sender<HostEvent>,
}

impl ChannelEventSource {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self { tx }
    }

    /// Deliver `event` to current subscribers; returns how many received it.
    pub fn emit(&self, event: HostEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for ChannelEventSource {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }
}

/// Turns successive observations into host events.
///
/// Emits `ThermalChanged` whenever the state differs from the previous
/// observation (the first observation only records it) and `MemoryWarning`
/// each time available memory crosses below the warning level.
#[derive(Debug, Clone)]
pub struct HostEventDetector {
    memory_warning_mb: f64,
    last_thermal: Option<ThermalState>,
    below_warning: bool,
}

impl HostEventDetector {
    pub fn new(memory_warning_mb: f64) -> Self {
        Self {
            memory_warning_mb,
            last_thermal: None,
            below_warning: false,
        }
    }

    pub fn observe(&mut self, available_mb: f64, thermal: ThermalState) -> Vec<HostEvent> {
        let mut events = Vec::new();

        let below = available_mb < self.memory_warning_mb;
        if below && !self.below_warning {
            events.push(HostEvent::MemoryWarning);
        }
        self.below_warning = below;

        if let Some(last) = self.last_thermal {
            if last != thermal {
                events.push(HostEvent::ThermalChanged(thermal));
            }
        }
        self.last_thermal = Some(thermal);

        events
    }
}

/// Background task polling a metrics source for host events
pub struct HostEventPoller {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl HostEventPoller {
    /// Spawn the poller on the current tokio runtime.
    pub fn spawn(
        source: Arc<dyn MetricsSource>,
        emitter: ChannelEventSource,
        poll_interval: Duration,
        memory_warning_mb: f64,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(poll_task(
            source,
            emitter,
            poll_interval,
            HostEventDetector::new(memory_warning_mb),
            shutdown_rx,
        ));

        Self {
            shutdown_tx,
            handle,
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            log::error!("Host event poller ended abnormally: {}", e);
        }
    }
}

async fn poll_task(
    source: Arc<dyn MetricsSource>,
    emitter: ChannelEventSource,
    poll_interval: Duration,
    mut detector: HostEventDetector,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::debug!("Host event poller started ({:?})", poll_interval);

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                let available = source.available_memory_mb();
                let thermal = source.thermal_state();
                for event in detector.observe(available, thermal) {
                    log::debug!("Host event {:?}", event);
                    emitter.emit(event);
                }
            }
        }
    }

    log::debug!("Host event poller stopped");
}
