//! Interfaces to the host environment.
//!
//! The monitor never talks to the OS directly: memory and thermal reads go
//! through [`MetricsSource`] and out-of-band notifications arrive through an
//! [`EventSource`]. Concrete implementations live in `crate::platform`.

use tokio::sync::broadcast;

use super::reading::ThermalState;

/// Black-box reads of the host's memory and thermal state.
pub trait MetricsSource: Send + Sync {
    /// Memory the process could still allocate, in MB.
    fn available_memory_mb(&self) -> f64;

    /// Installed physical memory, in MB.
    fn physical_memory_mb(&self) -> f64;

    fn thermal_state(&self) -> ThermalState;
}

/// Notifications raised by the host independently of the sampling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    MemoryWarning,
    ThermalChanged(ThermalState),
}

/// Subscription point for [`HostEvent`]s.
///
/// Dropping the returned receiver unsubscribes.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}
