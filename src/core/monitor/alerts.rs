//! Alert rules for pressure samples and host events.
//!
//! Alerts are plain signals: nothing is deduplicated, every qualifying sample
//! or event produces a fresh [`AlertEvent`] that replaces the current one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::host::HostEvent;
use super::reading::{Pressure, Reading, ThermalState};

/// What raised an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Pressure(Pressure),
    MemoryWarning,
    Thermal(ThermalState),
}

impl AlertKind {
    /// Event name carried by the urgent beacon for this alert.
    pub fn event_name(self) -> String {
        match self {
            AlertKind::Pressure(pressure) => pressure.as_str().to_uppercase(),
            AlertKind::MemoryWarning => "SYSTEM_MEMORY_WARNING".to_string(),
            AlertKind::Thermal(state) => format!("THERMAL_{}", state.as_str().to_uppercase()),
        }
    }
}

/// A user-visible alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl AlertEvent {
    fn new(kind: AlertKind, message: String) -> Self {
        Self {
            kind,
            message,
            raised_at: Utc::now(),
        }
    }

    pub fn event_name(&self) -> String {
        self.kind.event_name()
    }
}

/// Evaluate a classified sample against the alerting pressures.
pub fn evaluate(reading: &Reading, previous_available_mb: f64) -> Option<AlertEvent> {
    if !reading.pressure.is_alerting() {
        return None;
    }

    let delta = reading.available_memory_mb - previous_available_mb;
    Some(AlertEvent::new(
        AlertKind::Pressure(reading.pressure),
        format!(
            "Memory pressure {}: {:.0} MB available ({:+.0} MB since previous sample)",
            reading.pressure, reading.available_memory_mb, delta
        ),
    ))
}

/// Evaluate an out-of-band host event.
///
/// Memory warnings always alert. Thermal transitions alert only when the
/// new state is serious or critical.
pub fn evaluate_system_event(event: HostEvent, available_mb: f64) -> Option<AlertEvent> {
    match event {
        HostEvent::MemoryWarning => Some(AlertEvent::new(
            AlertKind::MemoryWarning,
            format!("System memory warning: {:.0} MB available", available_mb),
        )),
        HostEvent::ThermalChanged(state) if state.is_severe() => Some(AlertEvent::new(
            AlertKind::Thermal(state),
            format!("Thermal state changed to {}", state),
        )),
        HostEvent::ThermalChanged(_) => None,
    }
}
