//! Memory pressure monitoring core.
//!
//! Samples available memory and thermal state, classifies each sample into a
//! pressure level, keeps a bounded history, raises alerts and forwards status
//! beacons to a webhook.

pub mod alerts;
pub mod beacon;
mod classifier;
pub mod export;
mod host;
mod reading;
mod service;
mod store;

pub use alerts::{evaluate, evaluate_system_event, AlertEvent, AlertKind};
pub use beacon::{
    BeaconDispatcher, BeaconPayload, BeaconSnapshot, DeliveryOutcome, DEFAULT_ENDPOINT_BASE,
    HEARTBEAT_EVENT, USER_AGENT,
};
pub use classifier::{classify, PressureThresholds};
pub use export::{export_json, import_json, write_export};
pub use host::{EventSource, HostEvent, MetricsSource};
pub use reading::{Pressure, Reading, ThermalState};
pub use service::{MonitorConfig, MonitorService, MonitorSnapshot};
pub use store::{SampleStore, DEFAULT_MAX_READINGS};
