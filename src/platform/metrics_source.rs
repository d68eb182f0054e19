//! sysinfo-backed metrics source.

use parking_lot::Mutex;
use sysinfo::{Components, MemoryRefreshKind, RefreshKind, System};

use crate::core::monitor::{MetricsSource, ThermalState};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Assumed critical temperature for sensors that don't report one (°C)
const FALLBACK_CRITICAL_CELSIUS: f32 = 100.0;

/// Reads memory and temperature sensors through sysinfo.
pub struct SysinfoMetricsSource {
    system: Mutex<System>,
    components: Mutex<Components>,
    total_memory_mb: f64,
}

impl SysinfoMetricsSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_memory(MemoryRefreshKind::everything());
        let system = System::new_with_specifics(refresh_kind);
        let total_memory_mb = system.total_memory() as f64 / BYTES_PER_MB;

        Self {
            system: Mutex::new(system),
            components: Mutex::new(Components::new_with_refreshed_list()),
            total_memory_mb,
        }
    }
}

impl Default for SysinfoMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SysinfoMetricsSource {
    fn available_memory_mb(&self) -> f64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.available_memory() as f64 / BYTES_PER_MB
    }

    fn physical_memory_mb(&self) -> f64 {
        self.total_memory_mb
    }

    fn thermal_state(&self) -> ThermalState {
        let mut components = self.components.lock();
        components.refresh(true);
        thermal_state_from_sensors(
            components
                .iter()
                .filter_map(|comp| comp.temperature().map(|t| (t, comp.critical()))),
        )
    }
}

/// Map sensor readings `(current, critical)` to a thermal state using the
/// hottest sensor relative to its critical point.
///
/// Below 70% is nominal, below 85% fair, below 95% serious, otherwise
/// critical. No usable sensors means unknown.
pub fn thermal_state_from_sensors<I>(sensors: I) -> ThermalState
where
    I: IntoIterator<Item = (f32, Option<f32>)>,
{
    let hottest = sensors
        .into_iter()
        .filter(|(current, _)| current.is_finite() && *current > 0.0)
        .map(|(current, critical)| {
            let critical = critical
                .filter(|c| c.is_finite() && *c > 0.0)
                .unwrap_or(FALLBACK_CRITICAL_CELSIUS);
            current / critical
        })
        .fold(None, |max: Option<f32>, ratio| {
            Some(max.map_or(ratio, |m| m.max(ratio)))
        });

    match hottest {
        None => ThermalState::Unknown,
        Some(ratio) if ratio < 0.70 => ThermalState::Nominal,
        Some(ratio) if ratio < 0.85 => ThermalState::Fair,
        Some(ratio) if ratio < 0.95 => ThermalState::Serious,
        Some(_) => ThermalState::Critical,
    }
}
