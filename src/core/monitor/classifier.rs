//! Threshold-based memory pressure classification.

use serde::{Deserialize, Serialize};

use super::reading::Pressure;

/// Cumulative drop from baseline that counts as high pressure (MB).
pub const HIGH_DROP_FROM_BASELINE_MB: f64 = 500.0;
/// Cumulative drop from baseline that counts as elevated pressure (MB).
pub const ELEVATED_DROP_FROM_BASELINE_MB: f64 = 200.0;

/// Tunable thresholds for the low-memory and spike rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureThresholds {
    pub critical_low_mb: f64,
    pub critical_drop_mb: f64,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            critical_low_mb: 150.0,
            critical_drop_mb: 200.0,
        }
    }
}

/// Classify one sample. First matching rule wins:
///
/// 1. `available < critical_low_mb` is `Critical`
/// 2. drop from previous sample above `critical_drop_mb` is `SpikeDrop`
/// 3. drop from baseline above 500 MB is `High`
/// 4. drop from baseline above 200 MB is `Elevated`
/// 5. anything else is `Normal`
///
/// Pass `baseline = available` to neutralise the baseline rules when no
/// baseline has been captured yet.
pub fn classify(
    available: f64,
    previous_available: f64,
    baseline: f64,
    thresholds: &PressureThresholds,
) -> Pressure {
    let drop_from_previous = previous_available - available;
    let drop_from_baseline = baseline - available;

    if available < thresholds.critical_low_mb {
        Pressure::Critical
    } else if drop_from_previous > thresholds.critical_drop_mb {
        Pressure::SpikeDrop
    } else if drop_from_baseline > HIGH_DROP_FROM_BASELINE_MB {
        Pressure::High
    } else if drop_from_baseline > ELEVATED_DROP_FROM_BASELINE_MB {
        Pressure::Elevated
    } else {
        Pressure::Normal
    }
}
