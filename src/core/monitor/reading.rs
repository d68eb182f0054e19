//! Sample data model shared by the monitor components.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host thermal condition as reported by the metrics source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    Nominal,
    Fair,
    Serious,
    Critical,
    #[default]
    Unknown,
}

impl ThermalState {
    /// Serious and critical states are the ones worth interrupting the user for.
    pub fn is_severe(self) -> bool {
        matches!(self, ThermalState::Serious | ThermalState::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThermalState::Nominal => "nominal",
            ThermalState::Fair => "fair",
            ThermalState::Serious => "serious",
            ThermalState::Critical => "critical",
            ThermalState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Severity label assigned to a single sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pressure {
    #[default]
    Normal,
    Elevated,
    High,
    Critical,
    SpikeDrop,
}

impl Pressure {
    /// Pressures that raise a user alert and an urgent beacon.
    pub fn is_alerting(self) -> bool {
        matches!(self, Pressure::Critical | Pressure::SpikeDrop)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Pressure::Normal => "normal",
            Pressure::Elevated => "elevated",
            Pressure::High => "high",
            Pressure::Critical => "critical",
            Pressure::SpikeDrop => "spike_drop",
        }
    }
}

impl fmt::Display for Pressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One immutable memory/thermal sample.
///
/// Field names on the wire match the history export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "availableMemoryMB")]
    pub available_memory_mb: f64,
    #[serde(rename = "usedMemoryMB")]
    pub used_memory_mb: f64,
    #[serde(rename = "thermalState")]
    pub thermal_state: ThermalState,
    #[serde(rename = "memoryPressure")]
    pub pressure: Pressure,
}

impl Reading {
    /// Build a reading stamped with a fresh id and the current time.
    pub fn new(
        available_memory_mb: f64,
        used_memory_mb: f64,
        thermal_state: ThermalState,
        pressure: Pressure,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            available_memory_mb,
            used_memory_mb,
            thermal_state,
            pressure,
        }
    }
}
