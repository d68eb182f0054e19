// Host-specific collaborators for the monitor core

pub mod events;
pub mod metrics_source;

// Re-exports para imports limpios
pub use events::{ChannelEventSource, HostEventDetector, HostEventPoller};
pub use metrics_source::{thermal_state_from_sensors, SysinfoMetricsSource};
